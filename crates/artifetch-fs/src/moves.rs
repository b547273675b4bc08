use std::fs;
use std::io;
use std::path::Path;

use crate::{Error, Result, ensure_dir};

/// Move everything inside `from` into `to`, merging directories that exist
/// on both sides and replacing files. `from` is removed afterwards.
///
/// Falls back to copy-and-delete when a rename crosses devices.
pub fn move_dir_contents(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Result<()> {
    let from = from.as_ref();
    let to = to.as_ref();
    ensure_dir(to)?;
    merge_into(from, to)?;
    fs::remove_dir_all(from).map_err(|e| Error::Write {
        path: from.to_path_buf(),
        source: e,
    })
}

fn merge_into(from: &Path, to: &Path) -> Result<()> {
    let entries = fs::read_dir(from).map_err(|e| Error::Read {
        path: from.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::Read {
            path: from.to_path_buf(),
            source: e,
        })?;
        let src = entry.path();
        let dest = to.join(entry.file_name());

        if src.is_dir() && dest.is_dir() {
            merge_into(&src, &dest)?;
            continue;
        }
        if dest.is_dir() {
            fs::remove_dir_all(&dest).map_err(|e| Error::Write {
                path: dest.clone(),
                source: e,
            })?;
        } else if dest.exists() {
            fs::remove_file(&dest).map_err(|e| Error::Write {
                path: dest.clone(),
                source: e,
            })?;
        }
        rename_or_copy(&src, &dest)?;
    }
    Ok(())
}

fn rename_or_copy(src: &Path, dest: &Path) -> Result<()> {
    match fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.raw_os_error() == Some(18) || e.kind() == io::ErrorKind::CrossesDevices => {
            copy_recursive(src, dest)?;
            let removed = if src.is_dir() {
                fs::remove_dir_all(src)
            } else {
                fs::remove_file(src)
            };
            removed.map_err(|e| Error::Write {
                path: src.to_path_buf(),
                source: e,
            })
        }
        Err(e) => Err(Error::Move {
            from: src.to_path_buf(),
            to: dest.to_path_buf(),
            source: e,
        }),
    }
}

fn copy_recursive(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_dir() {
        return fs::copy(src, dest).map(drop).map_err(|e| Error::Write {
            path: dest.to_path_buf(),
            source: e,
        });
    }
    ensure_dir(dest)?;
    let entries = fs::read_dir(src).map_err(|e| Error::Read {
        path: src.to_path_buf(),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::Read {
            path: src.to_path_buf(),
            source: e,
        })?;
        copy_recursive(&entry.path(), &dest.join(entry.file_name()))?;
    }
    Ok(())
}
