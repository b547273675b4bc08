//! Retrieval of build artifacts into a local directory.
//!
//! An artifact lives in one of three backends: a hierarchical file container,
//! a content-addressable store or a file share. [`RetrievalServer`] picks the
//! provider for each artifact, filters its files with ordered glob patterns,
//! and materializes the selection with a bounded pool of transfer workers.
//!
//! The crate is split the usual way:
//!
//! - [`data`]: parameters, descriptors and outcomes
//! - [`plan`]: pure decisions (target layout, effective patterns, backoff)
//! - [`effects`]: backend ports, the transfer driver and the providers
//!
//! ```
//! use artifetch::{ArtifactSelection, DownloadParameters};
//!
//! let params = DownloadParameters::from_toml_str(r#"
//!     target_directory = "out"
//!     patterns = ["**", "!**/*.log"]
//!     selection = { single = "drop" }
//! "#).unwrap();
//! assert_eq!(params.selection, ArtifactSelection::Single("drop".into()));
//! ```

pub mod data;
pub mod effects;
mod error;
pub mod plan;

pub use artifetch_filter::MatchOptions;
pub use data::{
    ArtifactDescriptor, ArtifactItem, ArtifactSelection, BackendType, ContainerLocator,
    DedupLocator, DomainId, DownloadParameters, ItemKind, ManifestId, ProjectRef, PublishOutcome,
    TransferOutcome,
};
pub use effects::{
    ArtifactProvider, BlobContent, BlobStore, BulkRequest, BulkStats, ByteStream, CancelToken,
    ContainerClient, ContentEncoding, DedupClient, FileShareProvider, ItemPage, ManifestTarget,
    MirrorTool, ProviderFactory, RetrievalServer, Session, TelemetrySink, TracingSink,
    TransferDriver, TransferJob,
};
#[cfg(feature = "reqwest")]
pub use effects::{HttpContainerClient, HttpSession};
pub use error::{BackendError, CorruptedItem, Error, Result, TransferError};
pub use plan::retry_delay;
