use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to write '{path}': {source}")]
    Write { path: PathBuf, source: io::Error },

    #[error("failed to create directory '{path}': {source}")]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to move '{from}' to '{to}': {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[error("relative path '{path}' is not allowed: {reason}")]
    InvalidRelativePath { path: String, reason: &'static str },

    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),
}

impl Error {
    /// Underlying I/O error, if this error came from the operating system.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Read { source, .. }
            | Error::Write { source, .. }
            | Error::CreateDir { source, .. }
            | Error::Move { source, .. } => Some(source),
            Error::InvalidRelativePath { .. } | Error::NotADirectory(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
