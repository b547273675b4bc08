use std::path::Path;

use tempfile::TempDir;

use crate::{Error, Result, ensure_dir};

/// A uniquely named scratch directory, removed when dropped.
///
/// Used for work that must not leave partial output behind, such as
/// unpacking archives before their contents are moved into place. Only the
/// fresh directory is owned; whatever else lives in the parent is untouched.
#[derive(Debug)]
pub struct StagingDir(TempDir);

impl StagingDir {
    /// Create a new directory named `<prefix><random>` inside `parent`,
    /// creating `parent` first if needed.
    pub fn new_in(parent: impl AsRef<Path>, prefix: &str) -> Result<Self> {
        let parent = parent.as_ref();
        ensure_dir(parent)?;
        tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(parent)
            .map(Self)
            .map_err(|e| Error::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })
    }

    pub fn path(&self) -> &Path { self.0.path() }
}
