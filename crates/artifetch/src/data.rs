//! Immutable descriptions of what to download and what came out of it.

mod artifact;
mod item;
mod outcome;
mod params;

pub use artifact::{
    ArtifactDescriptor, BackendType, ContainerLocator, DedupLocator, DomainId, ManifestId,
    share_path,
};
pub use item::{ArtifactItem, ItemKind};
pub use outcome::{PublishOutcome, TransferOutcome};
pub use params::{ArtifactSelection, DownloadParameters, ProjectRef};
