use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use super::backend::Session;
use super::cancel::CancelToken;
use super::factory::ProviderFactory;
use super::file_share::FileShareProvider;
use super::provider::ArtifactProvider;
use super::telemetry::{TelemetrySink, properties};
use crate::data::{
    ArtifactDescriptor, ArtifactSelection, DownloadParameters, PublishOutcome, TransferOutcome,
};
use crate::error::{Error, Result};

/// Entry point for downloading and publishing build artifacts.
///
/// # Examples
///
/// ```no_run
/// # async fn demo(session: std::sync::Arc<dyn artifetch::Session>) -> artifetch::Result<()> {
/// use std::sync::Arc;
/// use artifetch::{ArtifactDescriptor, BackendType, CancelToken, DownloadParameters, RetrievalServer, TracingSink};
///
/// let server = RetrievalServer::new(session, Arc::new(TracingSink));
/// let artifact = ArtifactDescriptor::new("drop", BackendType::FileShare, r"\\builds\drop");
/// let params = DownloadParameters::new("out").patterns(["**", "!**/*.pdb"]);
/// let outcome = server
///     .download_single_artifact(&params, &artifact, &CancelToken::new())
///     .await?;
/// println!("{} files", outcome.file_count);
/// # Ok(())
/// # }
/// ```
pub struct RetrievalServer {
    factory: ProviderFactory,
    file_share: FileShareProvider,
    sink: Arc<dyn TelemetrySink>,
}

impl RetrievalServer {
    pub fn new(session: Arc<dyn Session>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            factory: ProviderFactory::new(session, sink.clone()),
            file_share: FileShareProvider::new(sink.clone()),
            sink,
        }
    }

    /// Replace the provider used by [`RetrievalServer::publish_artifact`].
    #[must_use]
    pub fn with_publisher(mut self, file_share: FileShareProvider) -> Self {
        self.file_share = file_share;
        self
    }

    /// Download the artifacts named by `params.selection` out of `artifacts`.
    pub async fn download(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        match &params.selection {
            ArtifactSelection::All => self.download_multiple_artifacts(params, artifacts, cancel).await,
            ArtifactSelection::Single(name) => {
                let artifact = artifacts
                    .iter()
                    .find(|a| a.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| Error::ArtifactNotFound(name.clone()))?;
                self.download_single_artifact(params, artifact, cancel).await
            }
        }
    }

    pub async fn download_single_artifact(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        params.validate()?;
        let provider = self.factory.get_provider(artifact)?;
        tracing::info!(artifact = %artifact.name, backend = %provider.backend(), "downloading artifact");
        let result = provider.download_single(params, artifact, cancel).await;
        self.report(std::slice::from_ref(artifact), &result);
        result
    }

    /// Download every artifact in `artifacts`, each under its own
    /// subdirectory of the target. Artifacts are grouped by backend and each
    /// group goes to its provider in one call.
    pub async fn download_multiple_artifacts(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        params.validate()?;
        let mut groups: Vec<(Arc<dyn ArtifactProvider>, Vec<ArtifactDescriptor>)> = Vec::new();
        for artifact in artifacts {
            let provider = self.factory.get_provider(artifact)?;
            match groups.iter().position(|(p, _)| p.backend() == provider.backend()) {
                Some(index) => groups[index].1.push(artifact.clone()),
                None => groups.push((provider, vec![artifact.clone()])),
            }
        }

        let started = Instant::now();
        let mut total = TransferOutcome::default();
        let mut result = Ok(());
        for (provider, group) in &groups {
            tracing::info!(backend = %provider.backend(), count = group.len(), "downloading artifacts");
            match provider.download_multiple(params, group, cancel).await {
                Ok(outcome) => total += outcome,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        total.elapsed = started.elapsed();

        let result = result.map(|()| total);
        self.report(artifacts, &result);
        result
    }

    /// Mirror the local directory `source` to the file share path `dest`.
    pub async fn publish_artifact(
        &self,
        source: impl AsRef<Path>,
        dest: impl AsRef<Path>,
        parallelism: usize,
        cancel: &CancelToken,
    ) -> Result<PublishOutcome> {
        let result = self
            .file_share
            .publish(source.as_ref(), dest.as_ref(), parallelism, cancel)
            .await;
        match &result {
            Ok(outcome) => self.sink.info(&format!(
                "Published {} file(s), {} bytes in {:.1}s",
                outcome.file_count,
                outcome.total_bytes,
                outcome.elapsed.as_secs_f64()
            )),
            Err(Error::Cancelled) => self.sink.warn("Publish cancelled"),
            Err(e) => tracing::error!(error = %e, "publish failed"),
        }
        result
    }

    fn report(&self, artifacts: &[ArtifactDescriptor], result: &Result<TransferOutcome>) {
        let names: Vec<&str> = artifacts.iter().map(|a| a.name.as_str()).collect();
        let backends: Vec<String> = artifacts
            .iter()
            .map(|a| match a.backend() {
                Ok(backend) => backend.as_str().to_string(),
                Err(_) => a.backend_type.clone(),
            })
            .collect();
        let (status, outcome) = match result {
            Ok(outcome) => ("succeeded", *outcome),
            Err(Error::Cancelled) => {
                self.sink.warn("Artifact download cancelled");
                ("cancelled", TransferOutcome::default())
            }
            Err(e) => {
                tracing::error!(artifacts = ?names, error = %e, "artifact download failed");
                ("failed", TransferOutcome::default())
            }
        };
        self.sink.event(
            "ArtifactRetrieval",
            properties(json!({
                "artifacts": names,
                "backends": backends,
                "status": status,
                "files": outcome.file_count,
                "bytes": outcome.total_bytes,
                "elapsed_ms": outcome.elapsed.as_millis() as u64,
            })),
        );
    }
}
