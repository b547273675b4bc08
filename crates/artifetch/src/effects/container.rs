use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use artifetch_archive::{extract_tar, is_tar};
use artifetch_fs::{StagingDir, join_relative, move_dir_contents, relative_slash_path};
use async_trait::async_trait;
use serde_json::json;

use super::backend::{BlobStore, ContainerClient, ContentEncoding, Session};
use super::cancel::CancelToken;
use super::driver::{DriverOptions, TransferDriver, TransferJob};
use super::provider::{ArtifactProvider, create_dirs, parent_dirs, select_paths, verify_lengths};
use super::retry::{RetryError, with_retry};
use super::stream::write_stream;
use super::telemetry::{TelemetrySink, properties};
use crate::data::{
    ArtifactDescriptor, ArtifactItem, BackendType, ContainerLocator, DownloadParameters, ProjectRef,
    TransferOutcome,
};
use crate::error::{Error, Result, TransferError};
use crate::plan::{artifact_dir, relative_to_root};

/// Name of the directory tarball contents are moved into.
pub const EXTRACTED_TARS_DIR: &str = "extracted_tars";
const TAR_STAGING_PREFIX: &str = ".artifetch-tars-";

/// Downloads artifacts stored in a hierarchical file container.
pub struct ContainerProvider {
    session: Arc<dyn Session>,
    sink: Arc<dyn TelemetrySink>,
}

/// Items of one artifact, resolved against the target directory.
struct ContainerPlan {
    folders: Vec<PathBuf>,
    files: Vec<PlannedFile>,
    listed_files: usize,
}

struct PlannedFile {
    item: ArtifactItem,
    relative: String,
    dest: PathBuf,
}

impl ContainerPlan {
    fn build(items: Vec<ArtifactItem>, root: &str, base: &Path, params: &DownloadParameters) -> Result<Self> {
        let mut folders = Vec::new();
        let mut candidates = Vec::new();
        for item in items {
            let Some(relative) = relative_to_root(&item.path, root) else {
                tracing::debug!(path = %item.path, root, "item outside artifact root");
                continue;
            };
            if item.is_file() {
                candidates.push((item, relative));
            } else {
                folders.push(join_relative(base, &relative)?);
            }
        }

        let listed_files = candidates.len();
        let selected = select_paths(candidates.iter().map(|(_, rel)| rel.as_str()), params);
        let mut files = Vec::with_capacity(selected.len());
        for (item, relative) in candidates {
            if selected.contains(&relative) {
                let dest = join_relative(base, &relative)?;
                files.push(PlannedFile { item, relative, dest });
            }
        }

        folders.extend(parent_dirs(base, files.iter().map(|f| &f.dest)));
        folders.push(base.to_path_buf());
        folders.sort();
        folders.dedup();
        Ok(Self {
            folders,
            files,
            listed_files,
        })
    }
}

/// How item bodies are fetched. Decided at most once per provider call,
/// before the first transfer that could use the blob store starts.
#[derive(Clone)]
enum BlobPath {
    Enabled(Arc<dyn BlobStore>),
    Disabled,
}

struct ItemContext {
    client: Arc<dyn ContainerClient>,
    blob: BlobPath,
    project: ProjectRef,
    container_id: u64,
}

struct ContainerJob {
    ctx: Arc<ItemContext>,
    item: ArtifactItem,
    label: String,
    dest: PathBuf,
}

impl ContainerJob {
    fn blob_store(&self) -> Option<(&Arc<dyn BlobStore>, &str)> {
        match (&self.ctx.blob, self.item.blob_id.as_deref()) {
            (BlobPath::Enabled(store), Some(id)) => Some((store, id)),
            _ => None,
        }
    }
}

#[async_trait]
impl TransferJob for ContainerJob {
    fn label(&self) -> &str { &self.label }

    /// Blob downloads retry on any failure; container streams only on I/O.
    fn is_retryable(&self, error: &TransferError) -> bool {
        match error {
            TransferError::Cancelled => false,
            _ if self.blob_store().is_some() => true,
            other => other.is_io(),
        }
    }

    async fn run(&self, _attempt: u32, cancel: &CancelToken) -> std::result::Result<u64, TransferError> {
        if let Some((store, id)) = self.blob_store() {
            let content = store.download_blob(id).await?;
            return write_stream(content.stream, &self.dest, content.encoding, cancel).await;
        }
        let body = self
            .ctx
            .client
            .download_item(&self.ctx.project, self.ctx.container_id, &self.item.path)
            .await?;
        write_stream(body, &self.dest, ContentEncoding::Identity, cancel).await
    }
}

impl ContainerProvider {
    pub fn new(session: Arc<dyn Session>, sink: Arc<dyn TelemetrySink>) -> Self {
        Self { session, sink }
    }

    async fn download_artifact(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        multiple: bool,
        blob_path: &mut Option<BlobPath>,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        let started = Instant::now();
        let locator = ContainerLocator::parse(artifact)?;
        let project = params
            .project
            .clone()
            .ok_or_else(|| Error::MissingProject(artifact.name.clone()))?;
        let client = self.session.container_client()?;

        let items = list_all_items(client.as_ref(), params, artifact, &project, &locator, cancel).await?;
        let base = artifact_dir(params, &artifact.name, multiple);
        let plan = ContainerPlan::build(items, &locator.root, &base, params)?;
        self.sink.info(&format!(
            "Artifact '{}': {} of {} file(s) selected",
            artifact.name,
            plan.files.len(),
            plan.listed_files
        ));

        create_dirs(plan.folders.iter().cloned(), params.parallelism, cancel).await?;

        let blob = self.blob_path(params, artifact, &plan, blob_path).await;
        let ctx = Arc::new(ItemContext {
            client,
            blob,
            project,
            container_id: locator.container_id,
        });
        let jobs: Vec<_> = plan
            .files
            .iter()
            .map(|file| ContainerJob {
                ctx: ctx.clone(),
                item: file.item.clone(),
                label: file.relative.clone(),
                dest: file.dest.clone(),
            })
            .collect();
        let stats = TransferDriver::new(DriverOptions::from_params(params))
            .run(jobs, cancel)
            .await?;

        if params.check_corruption {
            let expected: Vec<(PathBuf, u64)> = plan
                .files
                .iter()
                .map(|f| (f.dest.clone(), f.item.length))
                .collect();
            let items = verify_lengths(expected, params.parallelism).await;
            if !items.is_empty() {
                tracing::error!(artifact = %artifact.name, count = items.len(), "size check failed");
                return Err(Error::Corrupted { items });
            }
        }

        if params.extract_tars {
            let downloaded: Vec<_> = plan.files.iter().map(|f| f.dest.clone()).collect();
            extract_tarballs(params, downloaded, cancel).await?;
        }

        let outcome = TransferOutcome {
            file_count: stats.file_count,
            total_bytes: stats.total_bytes,
            elapsed: started.elapsed(),
        };
        self.sink.info(&format!(
            "Downloaded {} file(s), {} bytes for artifact '{}' in {:.1}s",
            outcome.file_count,
            outcome.total_bytes,
            artifact.name,
            outcome.elapsed.as_secs_f64()
        ));
        self.sink.event(
            "ArtifactDownload",
            properties(json!({
                "artifact": artifact.name,
                "backend": BackendType::Container.as_str(),
                "files": outcome.file_count,
                "bytes": outcome.total_bytes,
                "elapsed_ms": outcome.elapsed.as_millis() as u64,
                "blob_path": matches!(ctx.blob, BlobPath::Enabled(_)),
            })),
        );
        Ok(outcome)
    }

    /// Resolve the blob path for `plan`, reusing the decision already made
    /// earlier in the same call. A store that cannot be reached disables the
    /// path for every remaining artifact.
    async fn blob_path(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        plan: &ContainerPlan,
        resolved: &mut Option<BlobPath>,
    ) -> BlobPath {
        if !params.blob_path_enabled || !plan.files.iter().any(|f| f.item.blob_id.is_some()) {
            return BlobPath::Disabled;
        }
        if let Some(path) = resolved {
            return path.clone();
        }
        let path = match self.session.blob_store().await {
            Ok(store) => BlobPath::Enabled(store),
            Err(error) => {
                tracing::warn!(artifact = %artifact.name, %error, "blob store unavailable, using container downloads");
                self.sink.warn(&format!(
                    "Blob store unavailable for artifact '{}', falling back to container downloads: {error}",
                    artifact.name
                ));
                self.sink.event(
                    "BlobPathFallback",
                    properties(json!({
                        "artifact": artifact.name,
                        "reason": error.to_string(),
                    })),
                );
                BlobPath::Disabled
            }
        };
        *resolved = Some(path.clone());
        path
    }
}

#[async_trait]
impl ArtifactProvider for ContainerProvider {
    fn backend(&self) -> BackendType {
        BackendType::Container
    }

    async fn download_single(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        self.download_artifact(params, artifact, false, &mut None, cancel)
            .await
    }

    async fn download_multiple(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        let mut blob_path = None;
        let mut total = TransferOutcome::default();
        for artifact in artifacts {
            total += self
                .download_artifact(params, artifact, true, &mut blob_path, cancel)
                .await?;
        }
        Ok(total)
    }
}

async fn list_all_items(
    client: &dyn ContainerClient,
    params: &DownloadParameters,
    artifact: &ArtifactDescriptor,
    project: &ProjectRef,
    locator: &ContainerLocator,
    cancel: &CancelToken,
) -> Result<Vec<ArtifactItem>> {
    let mut items = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
        let page = with_retry(
            params.item_attempts(),
            params.retry_backoff(),
            cancel,
            &artifact.name,
            |e: &crate::error::BackendError| e.is_transient(),
            |_| client.list_items(project, locator.container_id, &locator.root, continuation.as_deref()),
        )
        .await
        .map_err(|e| match e {
            RetryError::Cancelled => Error::Cancelled,
            RetryError::Failed { error, .. } => Error::Listing {
                artifact: artifact.name.clone(),
                source: error,
            },
        })?;

        items.extend(page.items);
        match page.continuation {
            Some(token) if !token.is_empty() => continuation = Some(token),
            _ => break,
        }
    }
    tracing::debug!(artifact = %artifact.name, items = items.len(), "listed container items");
    Ok(items)
}

/// Unpack every downloaded `.tar` into `<target>/extracted_tars/<archive
/// path without extension>` and remove the tarballs.
pub(crate) async fn extract_tarballs(
    params: &DownloadParameters,
    downloaded: Vec<PathBuf>,
    cancel: &CancelToken,
) -> Result<()> {
    let target = params.target_directory.clone();
    let archives: Vec<(PathBuf, String)> = downloaded
        .into_iter()
        .filter(|path| is_tar(path))
        .filter_map(|path| {
            let relative = relative_slash_path(&target, &path)?;
            let stem = relative[..relative.len() - ".tar".len()].to_string();
            Some((path, stem))
        })
        .collect();
    if archives.is_empty() {
        return Ok(());
    }
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let staging_parent = params
        .extract_temp_path
        .clone()
        .unwrap_or_else(|| target.clone());
    let count = archives.len();
    let files = tokio::task::spawn_blocking(move || -> Result<usize> {
        let staging = StagingDir::new_in(&staging_parent, TAR_STAGING_PREFIX)?;
        let mut files = 0;
        for (archive, stem) in archives {
            let out = join_relative(staging.path(), &stem)?;
            let report = extract_tar(&archive, &out)?;
            tracing::debug!(archive = %archive.display(), files = report.files.len(), "extracted");
            files += report.files.len();
            std::fs::remove_file(&archive).map_err(|e| artifetch_fs::Error::Write {
                path: archive.clone(),
                source: e,
            })?;
        }
        move_dir_contents(staging.path(), target.join(EXTRACTED_TARS_DIR))?;
        Ok(files)
    })
    .await??;
    tracing::info!(count, files, "extracted tarballs");
    Ok(())
}
