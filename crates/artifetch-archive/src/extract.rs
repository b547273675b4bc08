use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use artifetch_fs::ensure_dir;
use tar::EntryType;

use crate::{Error, Result, sanitize_entry_path, sanitize_symlink_target};

#[derive(Clone, Debug, Default)]
pub struct ExtractReport {
    pub entry_count: usize,
    pub total_bytes: u64,
    /// Regular files written, in archive order.
    pub files: Vec<PathBuf>,
}

/// Whether `path` names an uncompressed tarball (`.tar`, any case).
pub fn is_tar(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("tar"))
}

/// Unpack the tarball at `archive` into `dest`.
///
/// Entries that would land outside `dest` abort the extraction. Hard links,
/// devices and other special entries are skipped.
pub fn extract_tar(archive: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<ExtractReport> {
    let archive_path = archive.as_ref();
    let dest = dest.as_ref();
    ensure_dir(dest)?;

    let file = File::open(archive_path).map_err(|e| Error::Open {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    let mut archive = tar::Archive::new(BufReader::new(file));
    let corrupted = || Error::Corrupted(archive_path.to_path_buf());

    let mut report = ExtractReport::default();
    for entry in archive.entries().map_err(|_| corrupted())? {
        let mut entry = entry.map_err(|_| corrupted())?;
        let raw_path = entry.path().map_err(|_| corrupted())?.into_owned();
        let target = sanitize_entry_path(&raw_path, dest)?;
        let entry_type = entry.header().entry_type();
        report.entry_count += 1;

        match entry_type {
            EntryType::Directory => ensure_dir(&target)?,
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                if let Some(parent) = target.parent() {
                    ensure_dir(parent)?;
                }
                entry.unpack(&target).map_err(|e| Error::ExtractionFailed {
                    path: target.clone(),
                    source: e,
                })?;
                report.total_bytes += entry.header().size().unwrap_or(0);
                report.files.push(target);
            }
            EntryType::Symlink => {
                let link_target = entry.link_name().map_err(|_| corrupted())?.map(|t| t.into_owned());
                let Some(link_target) = link_target else {
                    return Err(corrupted());
                };
                sanitize_symlink_target(&link_target, &target, dest)?;
                if let Some(parent) = target.parent() {
                    ensure_dir(parent)?;
                }
                entry.unpack(&target).map_err(|e| Error::ExtractionFailed {
                    path: target.clone(),
                    source: e,
                })?;
            }
            other => {
                tracing::debug!(entry = %raw_path.display(), kind = ?other, "skipping tar entry");
            }
        }
    }

    tracing::debug!(
        archive = %archive_path.display(),
        entries = report.entry_count,
        bytes = report.total_bytes,
        "extracted tarball"
    );
    Ok(report)
}
