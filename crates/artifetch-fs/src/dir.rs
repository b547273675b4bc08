use std::io;
use std::path::Path;

use crate::{Error, Result};

/// Create `path` and all of its parents.
///
/// Succeeds when the directory already exists, including when a concurrent
/// caller created it between the check and the create.
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.is_dir() {
        return Ok(());
    }
    match std::fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(Error::CreateDir {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub async fn ensure_dir_async(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir()) {
        return Ok(());
    }
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            match tokio::fs::metadata(path).await {
                Ok(m) if m.is_dir() => Ok(()),
                _ => Err(Error::NotADirectory(path.to_path_buf())),
            }
        }
        Err(e) => Err(Error::CreateDir {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
