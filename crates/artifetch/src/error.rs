use std::io;
use std::path::PathBuf;

/// Failure reported by a storage backend client.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BackendError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Unavailable(_) | BackendError::Io(_) => true,
            BackendError::Service { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            BackendError::NotFound(_) | BackendError::Protocol(_) => false,
        }
    }
}

/// Failure of a single item transfer attempt.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Fs(#[from] artifetch_fs::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("transfer cancelled")]
    Cancelled,
}

impl TransferError {
    /// I/O-class failures: local filesystem errors and transient backend errors.
    pub fn is_io(&self) -> bool {
        match self {
            TransferError::Io(_) => true,
            TransferError::Fs(e) => e.io_error().is_some(),
            TransferError::Backend(e) => e.is_transient(),
            TransferError::Cancelled => false,
        }
    }
}

/// A downloaded file whose on-disk length differs from the listed length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorruptedItem {
    pub path: PathBuf,
    pub expected: u64,
    /// `None` when the file is missing.
    pub actual: Option<u64>,
}

fn describe_corrupted(items: &[CorruptedItem]) -> String {
    items
        .iter()
        .map(|item| match item.actual {
            Some(actual) => format!(
                "'{}' (expected {} bytes, found {})",
                item.path.display(),
                item.expected,
                actual
            ),
            None => format!("'{}' (missing)", item.path.display()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown artifact backend type '{0}'")]
    UnknownBackend(String),

    #[error("invalid resource locator '{locator}' for artifact '{artifact}': {reason}")]
    InvalidLocator {
        artifact: String,
        locator: String,
        reason: &'static str,
    },

    #[error("a project identity is required to download artifact '{0}'")]
    MissingProject(String),

    #[error("invalid download parameters: {0}")]
    InvalidParameters(String),

    #[error("artifact '{0}' not found")]
    ArtifactNotFound(String),

    #[error("failed to list items of artifact '{artifact}': {source}")]
    Listing {
        artifact: String,
        #[source]
        source: BackendError,
    },

    #[error("transfer of '{path}' failed after {attempts} attempt(s): {source}")]
    TransferFailed {
        path: String,
        attempts: u32,
        #[source]
        source: TransferError,
    },

    #[error("bulk download for domain '{domain}' failed after {attempts} attempt(s): {source}")]
    BulkDownloadFailed {
        domain: String,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("{} downloaded file(s) failed the size check: {}", .items.len(), describe_corrupted(.items))]
    Corrupted { items: Vec<CorruptedItem> },

    #[error("mirror copy exited with code {code}")]
    PublishFailed { code: i32 },

    #[error("failed to run '{program}': {source}")]
    PublishSpawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read configuration '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("background task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Fs(#[from] artifetch_fs::Error),

    #[error(transparent)]
    Archive(#[from] artifetch_archive::Error),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        if e.is_cancelled() {
            Error::Cancelled
        } else {
            Error::Task(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Unavailable("down".into()).is_transient());
        assert!(BackendError::Service { status: 503, message: String::new() }.is_transient());
        assert!(!BackendError::Service { status: 404, message: String::new() }.is_transient());
        assert!(!BackendError::Protocol("bad json".into()).is_transient());
    }

    #[test]
    fn test_transfer_error_is_io() {
        assert!(TransferError::Io(io::Error::other("reset")).is_io());
        assert!(!TransferError::Cancelled.is_io());
        assert!(!TransferError::Backend(BackendError::NotFound("x".into())).is_io());
    }

    #[test]
    fn test_corrupted_message_lists_every_item() {
        let err = Error::Corrupted {
            items: vec![
                CorruptedItem { path: "a.bin".into(), expected: 10, actual: Some(4) },
                CorruptedItem { path: "b.bin".into(), expected: 3, actual: None },
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("2 downloaded file(s)"));
        assert!(message.contains("'a.bin' (expected 10 bytes, found 4)"));
        assert!(message.contains("'b.bin' (missing)"));
    }
}
