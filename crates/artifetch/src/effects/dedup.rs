use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use super::backend::{BulkRequest, DedupClient, ManifestTarget, Session};
use super::cancel::CancelToken;
use super::provider::ArtifactProvider;
use super::retry::{RetryError, with_retry};
use super::telemetry::{TelemetrySink, properties};
use crate::data::{
    ArtifactDescriptor, BackendType, DedupLocator, DomainId, DownloadParameters, TransferOutcome,
};
use crate::error::{BackendError, Error, Result};
use crate::plan::{artifact_dir, effective_patterns, scope_patterns};

/// Downloads content-addressable artifacts, one bulk call per domain.
pub struct DedupProvider {
    session: Arc<dyn Session>,
    sink: Arc<dyn TelemetrySink>,
    clients: Mutex<HashMap<DomainId, Arc<dyn DedupClient>>>,
}

impl DedupProvider {
    pub fn new(session: Arc<dyn Session>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            session,
            sink,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Client for `domain`, created on first use and reused afterwards.
    async fn client_for(&self, domain: &DomainId) -> Result<Arc<dyn DedupClient>> {
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(domain) {
            return Ok(client.clone());
        }
        let client = self.session.dedup_client(domain).await?;
        tracing::debug!(%domain, "created content-addressable client");
        clients.insert(domain.clone(), client.clone());
        Ok(client)
    }

    async fn download_batch(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        multiple: bool,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        let started = Instant::now();
        let mut by_domain: BTreeMap<DomainId, Vec<ManifestTarget>> = BTreeMap::new();
        for artifact in artifacts {
            let locator = DedupLocator::parse(artifact)?;
            by_domain.entry(locator.domain).or_default().push(ManifestTarget {
                manifest: locator.manifest,
                artifact_name: artifact.name.clone(),
                target: artifact_dir(params, &artifact.name, multiple),
            });
        }

        let base_patterns = effective_patterns(&params.patterns);
        let patterns: Vec<String> = if multiple {
            artifacts
                .iter()
                .flat_map(|a| scope_patterns(&a.name, &base_patterns, &params.match_options))
                .collect()
        } else {
            base_patterns
        };

        let mut total = TransferOutcome::default();
        for (domain, manifests) in by_domain {
            let client = self.client_for(&domain).await?;
            let request = BulkRequest {
                manifests,
                patterns: patterns.clone(),
                match_options: params.match_options,
                scoped_by_artifact: multiple,
                parallelism: params.parallelism,
            };
            let domain_started = Instant::now();
            let stats = with_retry(
                params.dedup_attempts,
                params.retry_backoff(),
                cancel,
                domain.as_str(),
                |_: &BackendError| true,
                |_| client.download(&request, cancel),
            )
            .await
            .map_err(|e| match e {
                RetryError::Cancelled => Error::Cancelled,
                RetryError::Failed { attempts, error } => Error::BulkDownloadFailed {
                    domain: domain.to_string(),
                    attempts,
                    source: error,
                },
            })?;

            let elapsed = domain_started.elapsed();
            self.sink.event(
                "DedupDownload",
                properties(json!({
                    "domain": domain.as_str(),
                    "manifests": request.manifests.len(),
                    "files": stats.file_count,
                    "bytes": stats.total_bytes,
                    "elapsed_ms": elapsed.as_millis() as u64,
                })),
            );
            total.file_count += stats.file_count;
            total.total_bytes += stats.total_bytes;
        }
        total.elapsed = started.elapsed();

        self.sink.info(&format!(
            "Downloaded {} file(s), {} bytes from {} content-addressable artifact(s) in {:.1}s",
            total.file_count,
            total.total_bytes,
            artifacts.len(),
            total.elapsed.as_secs_f64()
        ));
        Ok(total)
    }
}

#[async_trait]
impl ArtifactProvider for DedupProvider {
    fn backend(&self) -> BackendType {
        BackendType::ContentAddressable
    }

    async fn download_single(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        self.download_batch(params, std::slice::from_ref(artifact), false, cancel)
            .await
    }

    async fn download_multiple(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        self.download_batch(params, artifacts, true, cancel).await
    }
}
