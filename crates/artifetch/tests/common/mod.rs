#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use artifetch::effects::Properties;
use artifetch::{
    ArtifactItem, BackendError, BlobContent, BlobStore, BulkRequest, BulkStats, ByteStream,
    CancelToken, ContainerClient, ContentEncoding, DedupClient, DomainId, ItemPage, ProjectRef, Session, TelemetrySink,
};
use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::stream;

pub fn body(data: &[u8]) -> ByteStream {
    let chunks: Vec<io::Result<Bytes>> = data
        .chunks(7)
        .map(|c| Ok(Bytes::copy_from_slice(c)))
        .collect();
    Box::pin(stream::iter(chunks))
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn read(path: impl AsRef<Path>) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[derive(Default)]
pub struct RecordingSink {
    pub infos: Mutex<Vec<String>>,
    pub warnings: Mutex<Vec<String>>,
    pub events: Mutex<Vec<(String, Properties)>>,
}

impl RecordingSink {
    pub fn event_names(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn events_named(&self, name: &str) -> Vec<Properties> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl TelemetrySink for RecordingSink {
    fn info(&self, line: &str) {
        self.infos.lock().unwrap().push(line.to_string());
    }

    fn warn(&self, line: &str) {
        self.warnings.lock().unwrap().push(line.to_string());
    }

    fn event(&self, name: &str, properties: Properties) {
        self.events.lock().unwrap().push((name.to_string(), properties));
    }
}

/// In-memory container serving listings in pages and tracking how many
/// downloads run at once.
#[derive(Default)]
pub struct FakeContainer {
    pub items: Vec<ArtifactItem>,
    pub contents: HashMap<String, Vec<u8>>,
    pub page_size: usize,
    /// Path -> number of leading attempts that fail with an I/O error.
    pub flaky: Mutex<HashMap<String, usize>>,
    /// Paths served with fewer bytes than listed.
    pub truncated: Vec<String>,
    /// Paths that always fail with a non-transient error.
    pub broken: Vec<String>,
    pub delay: Duration,
    pub list_calls: AtomicUsize,
    pub downloads: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeContainer {
    pub fn new() -> Self {
        Self {
            page_size: 100,
            ..Self::default()
        }
    }

    pub fn folder(mut self, path: &str) -> Self {
        self.items.push(ArtifactItem::folder(path));
        self
    }

    pub fn file(mut self, path: &str, data: &[u8]) -> Self {
        self.items.push(ArtifactItem::file(path, data.len() as u64));
        self.contents.insert(path.to_string(), data.to_vec());
        self
    }

    pub fn blob_file(mut self, path: &str, blob: &str, data: &[u8]) -> Self {
        self.items
            .push(ArtifactItem::file(path, data.len() as u64).with_blob(blob));
        self.contents.insert(path.to_string(), data.to_vec());
        self
    }
}

#[async_trait]
impl ContainerClient for FakeContainer {
    async fn list_items(
        &self,
        _project: &ProjectRef,
        _container_id: u64,
        _root: &str,
        continuation: Option<&str>,
    ) -> Result<ItemPage, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let start: usize = continuation.map(|c| c.parse().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(self.items.len());
        Ok(ItemPage {
            items: self.items[start..end].to_vec(),
            continuation: (end < self.items.len()).then(|| end.to_string()),
        })
    }

    async fn download_item(
        &self,
        _project: &ProjectRef,
        _container_id: u64,
        path: &str,
    ) -> Result<ByteStream, BackendError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.broken.iter().any(|p| p == path) {
            return Err(BackendError::NotFound(path.to_string()));
        }
        {
            let mut flaky = self.flaky.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(path)
                && *remaining > 0
            {
                *remaining -= 1;
                return Err(BackendError::Io(io::Error::other("connection reset")));
            }
        }
        let data = self
            .contents
            .get(path)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
        if self.truncated.iter().any(|p| p == path) {
            return Ok(body(&data[..data.len() / 2]));
        }
        Ok(body(&data))
    }
}

/// Blob store holding gzip-compressed bodies.
#[derive(Default)]
pub struct FakeBlobStore {
    pub blobs: HashMap<String, Vec<u8>>,
    pub fetches: AtomicUsize,
}

impl FakeBlobStore {
    pub fn with_blob(mut self, id: &str, data: &[u8]) -> Self {
        self.blobs.insert(id.to_string(), gzip(data));
        self
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn download_blob(&self, blob_id: &str) -> Result<BlobContent, BackendError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self
            .blobs
            .get(blob_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(blob_id.to_string()))?;
        Ok(BlobContent {
            stream: body(&data),
            encoding: ContentEncoding::Gzip,
        })
    }
}

/// Content-addressable domain that writes manifest files to their targets.
#[derive(Default)]
pub struct FakeDedup {
    /// Manifest id -> (relative path, bytes).
    pub manifests: HashMap<String, Vec<(String, Vec<u8>)>>,
    pub failures_left: AtomicUsize,
    pub requests: Mutex<Vec<BulkRequest>>,
}

impl FakeDedup {
    pub fn manifest(mut self, id: &str, files: &[(&str, &[u8])]) -> Self {
        self.manifests.insert(
            id.to_string(),
            files.iter().map(|(p, d)| (p.to_string(), d.to_vec())).collect(),
        );
        self
    }

    pub fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl DedupClient for FakeDedup {
    async fn download(&self, request: &BulkRequest, _cancel: &CancelToken) -> Result<BulkStats, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendError::Service {
                status: 500,
                message: "dedup service hiccup".into(),
            });
        }

        let filter = artifetch_filter::Filter::new(&request.patterns, &request.match_options);
        let mut stats = BulkStats::default();
        for target in &request.manifests {
            let files = self
                .manifests
                .get(target.manifest.as_str())
                .ok_or_else(|| BackendError::NotFound(target.manifest.to_string()))?;
            let keyed: Vec<String> = files
                .iter()
                .map(|(path, _)| {
                    if request.scoped_by_artifact {
                        format!("{}/{}", target.artifact_name, path)
                    } else {
                        path.clone()
                    }
                })
                .collect();
            let selected = filter.apply(&keyed);
            for ((path, data), key) in files.iter().zip(&keyed) {
                if !selected.contains(key) {
                    continue;
                }
                let dest = target.target.join(path);
                std::fs::create_dir_all(dest.parent().unwrap())?;
                std::fs::write(&dest, data)?;
                stats.file_count += 1;
                stats.total_bytes += data.len() as u64;
            }
        }
        Ok(stats)
    }
}

#[derive(Default)]
pub struct FakeSession {
    pub container: Option<Arc<FakeContainer>>,
    pub blobs: Option<Arc<FakeBlobStore>>,
    pub domains: HashMap<String, Arc<FakeDedup>>,
    pub dedup_clients_created: AtomicUsize,
}

impl FakeSession {
    pub fn with_container(container: FakeContainer) -> Self {
        Self {
            container: Some(Arc::new(container)),
            ..Self::default()
        }
    }

    pub fn blobs(mut self, store: FakeBlobStore) -> Self {
        self.blobs = Some(Arc::new(store));
        self
    }

    pub fn domain(mut self, id: &str, client: FakeDedup) -> Self {
        self.domains.insert(id.to_string(), Arc::new(client));
        self
    }

    pub fn fake_container(&self) -> &FakeContainer {
        self.container.as_deref().unwrap()
    }
}

#[async_trait]
impl Session for FakeSession {
    fn container_client(&self) -> Result<Arc<dyn ContainerClient>, BackendError> {
        match &self.container {
            Some(container) => Ok(container.clone()),
            None => Err(BackendError::Unavailable("no container service".into())),
        }
    }

    async fn blob_store(&self) -> Result<Arc<dyn BlobStore>, BackendError> {
        match &self.blobs {
            Some(store) => Ok(store.clone()),
            None => Err(BackendError::Unavailable("blob store offline".into())),
        }
    }

    async fn dedup_client(&self, domain: &DomainId) -> Result<Arc<dyn DedupClient>, BackendError> {
        self.dedup_clients_created.fetch_add(1, Ordering::SeqCst);
        match self.domains.get(domain.as_str()) {
            Some(client) => Ok(client.clone()),
            None => Err(BackendError::Unavailable(format!("unknown domain {domain}"))),
        }
    }
}

pub fn project() -> ProjectRef {
    ProjectRef::Id("proj".into())
}
