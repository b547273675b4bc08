use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to open archive '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("archive '{0}' is corrupted")]
    Corrupted(PathBuf),

    #[error("entry '{entry}' resolves outside the extraction directory")]
    PathEscape { entry: PathBuf },

    #[error("symlink '{link}' points outside the extraction directory: '{target}'")]
    SymlinkEscape { link: PathBuf, target: PathBuf },

    #[error("failed to extract '{path}': {source}")]
    ExtractionFailed { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Fs(#[from] artifetch_fs::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
