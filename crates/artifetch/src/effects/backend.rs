use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use artifetch_filter::MatchOptions;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use super::cancel::CancelToken;
use crate::data::{ArtifactItem, DomainId, ManifestId, ProjectRef};
use crate::error::BackendError;

pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Body of a downloaded item.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// One page of a container listing.
#[derive(Clone, Debug, Default)]
pub struct ItemPage {
    pub items: Vec<ArtifactItem>,
    /// Token for the next page; `None` on the last page.
    pub continuation: Option<String>,
}

/// Hierarchical file container service.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    async fn list_items(
        &self,
        project: &ProjectRef,
        container_id: u64,
        root: &str,
        continuation: Option<&str>,
    ) -> Result<ItemPage, BackendError>;

    async fn download_item(
        &self,
        project: &ProjectRef,
        container_id: u64,
        path: &str,
    ) -> Result<ByteStream, BackendError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
}

pub struct BlobContent {
    pub stream: ByteStream,
    pub encoding: ContentEncoding,
}

/// Content-addressable blob store used as a fast path for container items.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download_blob(&self, blob_id: &str) -> Result<BlobContent, BackendError>;
}

/// A manifest and the directory its files are materialized into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestTarget {
    pub manifest: ManifestId,
    pub artifact_name: String,
    pub target: PathBuf,
}

/// One bulk request against a single domain.
///
/// `patterns` apply to manifest-relative paths. When `scoped_by_artifact` is
/// set, paths are matched as `<artifact name>/<path>` so one combined list
/// can address several manifests.
#[derive(Clone, Debug)]
pub struct BulkRequest {
    pub manifests: Vec<ManifestTarget>,
    pub patterns: Vec<String>,
    pub match_options: MatchOptions,
    pub scoped_by_artifact: bool,
    pub parallelism: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BulkStats {
    pub file_count: u64,
    pub total_bytes: u64,
}

/// Client of one content-addressable domain, able to materialize whole
/// manifests in a single call.
#[async_trait]
pub trait DedupClient: Send + Sync {
    async fn download(&self, request: &BulkRequest, cancel: &CancelToken) -> Result<BulkStats, BackendError>;
}

/// Authenticated connection to the artifact services of one organization.
#[async_trait]
pub trait Session: Send + Sync {
    fn container_client(&self) -> Result<Arc<dyn ContainerClient>, BackendError>;

    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, BackendError>;

    async fn dedup_client(&self, domain: &DomainId) -> Result<Arc<dyn DedupClient>, BackendError>;
}
