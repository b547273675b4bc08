use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::{Error, Result, relative_slash_path};

/// A regular file found under a walk root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
    pub path: PathBuf,
    pub len: u64,
}

/// Recursively enumerate every regular file under `root`.
///
/// Entries are sorted by relative path. Symlinked directories are not
/// followed; symlinked files are reported with their target's length.
pub fn walk_files(root: impl AsRef<Path>) -> Result<Vec<WalkEntry>> {
    let root = root.as_ref();
    let metadata = fs::metadata(root).map_err(|e| Error::Read {
        path: root.to_path_buf(),
        source: e,
    })?;
    if !metadata.is_dir() {
        return Err(Error::NotADirectory(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    walk_into(root, root, &mut entries)?;
    entries.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(entries)
}

fn walk_into(root: &Path, dir: &Path, out: &mut Vec<WalkEntry>) -> Result<()> {
    for entry in fs::read_dir(dir).map_err(read_error(dir))? {
        let entry = entry.map_err(read_error(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(read_error(&path))?;

        if file_type.is_dir() {
            walk_into(root, &path, out)?;
            continue;
        }

        let metadata = fs::metadata(&path).map_err(read_error(&path))?;
        if !metadata.is_file() {
            continue;
        }
        let Some(relative) = relative_slash_path(root, &path) else {
            tracing::warn!(path = %path.display(), "skipping file with a non UTF-8 name");
            continue;
        };
        out.push(WalkEntry {
            relative,
            path,
            len: metadata.len(),
        });
    }
    Ok(())
}

fn read_error(path: &Path) -> impl FnOnce(io::Error) -> Error {
    let path = path.to_path_buf();
    move |source| Error::Read { path, source }
}
