//! Everything that touches the network, the disk or a clock.

mod backend;
mod cancel;
mod container;
mod dedup;
mod driver;
mod factory;
mod file_share;
mod http;
mod provider;
mod retry;
mod server;
mod stream;
mod telemetry;

pub use backend::{
    BlobContent, BlobStore, BoxStream, BulkRequest, BulkStats, ByteStream, ContainerClient,
    ContentEncoding, DedupClient, ItemPage, ManifestTarget, Session,
};
pub use cancel::CancelToken;
pub use container::{ContainerProvider, EXTRACTED_TARS_DIR};
pub use dedup::DedupProvider;
pub use driver::{DriverOptions, DriverStats, TransferDriver, TransferJob};
pub use factory::ProviderFactory;
pub use file_share::{FileShareProvider, MirrorTool, ROBOCOPY_FAILURE_THRESHOLD, mirror_failed};
#[cfg(feature = "reqwest")]
pub use http::{HttpContainerClient, HttpSession};
pub use provider::ArtifactProvider;
pub use server::RetrievalServer;
pub use telemetry::{Properties, TelemetrySink, TracingSink};
