use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use artifetch_filter::Filter;
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt, stream};

use super::cancel::CancelToken;
use crate::data::{ArtifactDescriptor, BackendType, DownloadParameters, TransferOutcome};
use crate::error::{Error, Result};
use crate::plan::effective_patterns;

/// Downloads artifacts of one backend type.
#[async_trait]
pub trait ArtifactProvider: Send + Sync {
    fn backend(&self) -> BackendType;

    async fn download_single(
        &self,
        params: &DownloadParameters,
        artifact: &ArtifactDescriptor,
        cancel: &CancelToken,
    ) -> Result<TransferOutcome>;

    async fn download_multiple(
        &self,
        params: &DownloadParameters,
        artifacts: &[ArtifactDescriptor],
        cancel: &CancelToken,
    ) -> Result<TransferOutcome>;
}

/// Relative paths of `universe` selected by the request's patterns.
pub(crate) fn select_paths<'a, I>(universe: I, params: &DownloadParameters) -> HashSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let patterns = effective_patterns(&params.patterns);
    Filter::new(&patterns, &params.match_options).apply(universe)
}

/// Parents of `files` that lie strictly under `base`.
pub(crate) fn parent_dirs<'a>(base: &Path, files: impl IntoIterator<Item = &'a PathBuf>) -> BTreeSet<PathBuf> {
    files
        .into_iter()
        .filter_map(|file| file.parent())
        .filter(|dir| dir.starts_with(base))
        .map(Path::to_path_buf)
        .collect()
}

/// Create every directory in `dirs`, up to `parallelism` at once. Completes
/// before any file transfer is scheduled.
pub(crate) async fn create_dirs(
    dirs: impl IntoIterator<Item = PathBuf>,
    parallelism: usize,
    cancel: &CancelToken,
) -> Result<()> {
    let creation = stream::iter(dirs.into_iter().map(Ok::<_, artifetch_fs::Error>))
        .try_for_each_concurrent(parallelism.max(1), |dir| async move {
            artifetch_fs::ensure_dir_async(&dir).await
        });
    match cancel.run(creation).await {
        None => Err(Error::Cancelled),
        Some(result) => Ok(result?),
    }
}

/// Compare on-disk lengths with expected lengths, collecting every mismatch.
pub(crate) async fn verify_lengths(
    files: impl IntoIterator<Item = (PathBuf, u64)>,
    parallelism: usize,
) -> Vec<crate::error::CorruptedItem> {
    let mut corrupted: Vec<_> = stream::iter(files)
        .map(|(path, expected)| async move {
            let actual = tokio::fs::metadata(&path).await.ok().map(|m| m.len());
            (actual != Some(expected)).then_some(crate::error::CorruptedItem { path, expected, actual })
        })
        .buffer_unordered(parallelism.max(1))
        .filter_map(|item| async move { item })
        .collect()
        .await;
    corrupted.sort_by(|a, b| a.path.cmp(&b.path));
    corrupted
}
