use std::path::Path;

use crate::{Error, Result};

/// Copy `src` to `dest`, replacing `dest` if it exists. Returns bytes copied.
///
/// The parent of `dest` must already exist.
pub async fn copy_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<u64> {
    let src = src.as_ref();
    let dest = dest.as_ref();

    if let Err(e) = tokio::fs::metadata(src).await {
        return Err(Error::Read {
            path: src.to_path_buf(),
            source: e,
        });
    }

    tokio::fs::copy(src, dest).await.map_err(|e| Error::Write {
        path: dest.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_copy_file() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dest.txt");
        std::fs::write(&src, "payload").unwrap();

        let copied = copy_file(&src, &dest).await.unwrap();
        assert_eq!(copied, 7);
        assert_eq!(std::fs::read(&dest).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_copy_file_overwrites() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dest = dir.path().join("dest.txt");
        std::fs::write(&src, "new").unwrap();
        std::fs::write(&dest, "old contents").unwrap();

        copy_file(&src, &dest).await.unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let dir = tempdir().unwrap();
        let err = copy_file(dir.path().join("nope"), dir.path().join("out"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
