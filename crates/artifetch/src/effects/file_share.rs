use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use artifetch_fs::{WalkEntry, copy_file, join_relative, walk_files};
use async_trait::async_trait;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::cancel::CancelToken;
use super::driver::{DriverOptions, TransferDriver, TransferJob};
use super::provider::{ArtifactProvider, create_dirs, parent_dirs, select_paths};
use super::telemetry::{TelemetrySink, properties};
use crate::data::{
    ArtifactDescriptor, BackendType, DownloadParameters, PublishOutcome, TransferOutcome, share_path,
};
use crate::error::{Error, Result, TransferError};
use crate::plan::artifact_dir;

/// Exit codes at or above this value mean robocopy failed.
pub const ROBOCOPY_FAILURE_THRESHOLD: i32 = 8;

/// Whether a robocopy exit code reports failure. Codes below 8 are bitmasks
/// of successful outcomes (files copied, extra files, mismatches).
pub fn mirror_failed(code: i32) -> bool {
    !(0..ROBOCOPY_FAILURE_THRESHOLD).contains(&code)
}

/// Tool used to mirror a directory tree when publishing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MirrorTool {
    /// `robocopy /E /MT:n`, the native tool on Windows.
    Robocopy,
    /// Walk and copy in-process with the transfer driver.
    Builtin,
}

impl Default for MirrorTool {
    fn default() -> Self {
        if cfg!(windows) { MirrorTool::Robocopy } else { MirrorTool::Builtin }
    }
}

/// Downloads artifacts that are plain directories on a file share, and
/// publishes local directories to one.
pub struct FileShareProvider {
    sink: Arc<dyn TelemetrySink>,
    mirror: MirrorTool,
}

struct CopyJob {
    label: String,
    src: PathBuf,
    dest: PathBuf,
}

#[async_trait]
impl TransferJob for CopyJob {
    fn label(&self) -> &str { &self.label }

    fn is_retryable(&self, _error: &TransferError) -> bool {
        false
    }

    async fn run(&self, _attempt: u32, cancel: &CancelToken) -> std::result::Result<u64, TransferError> {
        match cancel.run(copy_file(&self.src, &self.dest)).await {
            Some(copied) => Ok(copied?),
            None => Err(TransferError::Cancelled),
        }
    }
}

/// Walk `source`, keep what `select` accepts, create the destination folders
/// and copy the files through the driver.
async fn mirror_tree(
    source: &Path,
    dest: &Path,
    options: DriverOptions,
    select: impl FnOnce(&[WalkEntry]) -> Vec<WalkEntry>,
    cancel: &CancelToken,
) -> Result<(u64, u64)> {
    let root = source.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || walk_files(root)).await??;
    let entries = select(&entries);

    let mut jobs = Vec::with_capacity(entries.len());
    for entry in entries {
        let target = join_relative(dest, &entry.relative)?;
        jobs.push(CopyJob {
            label: entry.relative,
            src: entry.path,
            dest: target,
        });
    }
    let mut dirs = parent_dirs(dest, jobs.iter().map(|j| &j.dest));
    dirs.insert(dest.to_path_buf());
    create_dirs(dirs, options.parallelism, cancel).await?;

    let stats = TransferDriver::new(options).run(jobs, cancel).await?;
    Ok((stats.file_count, stats.total_bytes))
}

impl FileShareProvider {
    pub fn new(sink: Arc<dyn TelemetrySink>) -> Self {
        Self {
            sink,
            mirror: MirrorTool::default(),
        }
    }

    #[must_use]
    pub fn with_mirror_tool(mut self, mirror: MirrorTool) -> Self {
        self.mirror = mirror;
        self
    }

    async fn download_artifact(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        multiple: bool,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        let started = Instant::now();
        let source = share_path(artifact)?;
        let base = artifact_dir(params, &artifact.name, multiple);
        self.sink
            .info(&format!("Copying artifact '{}' from '{}'", artifact.name, source.display()));

        let (file_count, total_bytes) = mirror_tree(
            &source,
            &base,
            DriverOptions::from_params(params),
            |entries| {
                let selected = select_paths(entries.iter().map(|e| e.relative.as_str()), params);
                entries
                    .iter()
                    .filter(|e| selected.contains(&e.relative))
                    .cloned()
                    .collect()
            },
            cancel,
        )
        .await?;

        let outcome = TransferOutcome {
            file_count,
            total_bytes,
            elapsed: started.elapsed(),
        };
        self.sink.info(&format!(
            "Copied {} file(s), {} bytes for artifact '{}' in {:.1}s",
            outcome.file_count,
            outcome.total_bytes,
            artifact.name,
            outcome.elapsed.as_secs_f64()
        ));
        self.sink.event(
            "ArtifactDownload",
            properties(json!({
                "artifact": artifact.name,
                "backend": BackendType::FileShare.as_str(),
                "files": outcome.file_count,
                "bytes": outcome.total_bytes,
                "elapsed_ms": outcome.elapsed.as_millis() as u64,
            })),
        );
        Ok(outcome)
    }

    /// Copy the directory tree at `source` to `dest`, `parallelism` files at
    /// a time.
    pub async fn publish(
        &self,
        source: &Path,
        dest: &Path,
        parallelism: usize,
        cancel: &CancelToken,
    ) -> Result<PublishOutcome> {
        let started = Instant::now();
        if !tokio::fs::metadata(source).await.is_ok_and(|m| m.is_dir()) {
            return Err(artifetch_fs::Error::NotADirectory(source.to_path_buf()).into());
        }
        self.sink
            .info(&format!("Publishing '{}' to '{}'", source.display(), dest.display()));

        let mut outcome = match self.mirror {
            MirrorTool::Robocopy => self.robocopy(source, dest, parallelism, cancel).await?,
            MirrorTool::Builtin => {
                let options = DriverOptions {
                    parallelism: parallelism.max(1),
                    queue_capacity: parallelism.max(1) * 64,
                    attempts: 1,
                    backoff: Duration::ZERO,
                };
                let (file_count, total_bytes) =
                    mirror_tree(source, dest, options, <[WalkEntry]>::to_vec, cancel).await?;
                PublishOutcome {
                    file_count,
                    total_bytes,
                    ..PublishOutcome::default()
                }
            }
        };
        outcome.elapsed = started.elapsed();

        self.sink.event(
            "ArtifactPublish",
            properties(json!({
                "source": source.display().to_string(),
                "destination": dest.display().to_string(),
                "files": outcome.file_count,
                "bytes": outcome.total_bytes,
                "exit_code": outcome.exit_code,
                "elapsed_ms": outcome.elapsed.as_millis() as u64,
            })),
        );
        Ok(outcome)
    }

    async fn robocopy(
        &self,
        source: &Path,
        dest: &Path,
        parallelism: usize,
        cancel: &CancelToken,
    ) -> Result<PublishOutcome> {
        let program = "robocopy";
        let mut child = Command::new(program)
            .arg(source)
            .arg(dest)
            .args(["/E", "/NP", "/R:3", "/W:1"])
            .arg(format!("/MT:{}", parallelism.clamp(1, 128)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::PublishSpawn {
                program: program.to_string(),
                source: e,
            })?;

        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            let sink = self.sink.clone();
            forwarders.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        sink.info(line.trim_end());
                    }
                }
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            let sink = self.sink.clone();
            forwarders.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    sink.warn(line.trim_end());
                }
            }));
        }

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::debug!(error = %e, "failed to kill robocopy");
                }
                return Err(Error::Cancelled);
            }
            status = child.wait() => status.map_err(|e| Error::PublishSpawn {
                program: program.to_string(),
                source: e,
            })?,
        };
        for forwarder in forwarders {
            if let Err(e) = forwarder.await {
                tracing::debug!(error = %e, "output forwarder failed");
            }
        }

        let code = status.code().unwrap_or(-1);
        if mirror_failed(code) {
            tracing::error!(code, "robocopy failed");
            return Err(Error::PublishFailed { code });
        }
        let (file_count, total_bytes) = count_tree(dest).await?;
        Ok(PublishOutcome {
            file_count,
            total_bytes,
            exit_code: Some(code),
            ..PublishOutcome::default()
        })
    }
}

async fn count_tree(root: &Path) -> Result<(u64, u64)> {
    let root = root.to_path_buf();
    let entries = tokio::task::spawn_blocking(move || walk_files(root)).await??;
    Ok((entries.len() as u64, entries.iter().map(|e| e.len).sum()))
}

#[async_trait]
impl ArtifactProvider for FileShareProvider {
    fn backend(&self) -> BackendType {
        BackendType::FileShare
    }

    async fn download_single(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        self.download_artifact(params, artifact, false, cancel).await
    }

    async fn download_multiple(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        cancel: &CancelToken,
    ) -> Result<TransferOutcome> {
        let mut total = TransferOutcome::default();
        for artifact in artifacts {
            total += self.download_artifact(params, artifact, true, cancel).await?;
        }
        Ok(total)
    }
}
