//! Local cache reconciler.
//!
//! Brings the met-file cache directory in line with one window's
//! requirement set: delete what the window no longer needs, download what
//! it lacks, and keep the ledger's local-availability flags current. The
//! cache is strictly windowed; nothing persists past its need.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use splitflow_db::{MetFileRecord, MetFileStore};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

use crate::archive::ArchiveClient;

/// What one reconciliation pass did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Local files deleted because the window does not need them.
    pub deleted: u64,
    /// Required files already present (not re-downloaded).
    pub kept: u64,
    /// Required files downloaded this pass.
    pub downloaded: u64,
    /// Required files that could not be retrieved.
    pub failed: Vec<String>,
}

/// Filenames of remote-available records whose valid time falls inside the
/// inclusive span.
pub fn required_filenames(
    records: &[MetFileRecord],
    span: (DateTime<Utc>, DateTime<Utc>),
) -> BTreeSet<String> {
    records
        .iter()
        .filter(|rec| rec.valid_time >= span.0 && rec.valid_time <= span.1)
        .map(|rec| rec.filename.clone())
        .collect()
}

/// Synchronize `cache_dir` with `required`.
///
/// Downloads are sequential; one failed transfer is recorded and the rest
/// of the batch still runs. A downloaded file with no catalog row is a
/// ledger inconsistency: logged, not fatal.
pub async fn reconcile<A: ArchiveClient>(
    cache_dir: &Path,
    required: &BTreeSet<String>,
    archive: &mut A,
    files: &MetFileStore,
) -> Result<ReconcileReport> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;

    let mut report = ReconcileReport::default();
    let mut to_download = required.clone();

    // Pass 1: sweep the cache. Present-and-required files are kept and
    // dropped from the download list; everything else is deleted.
    let entries = std::fs::read_dir(cache_dir)
        .with_context(|| format!("Failed to scan cache directory {}", cache_dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();

        if to_download.remove(&name) {
            report.kept += 1;
        } else {
            std::fs::remove_file(entry.path())
                .with_context(|| format!("Failed to delete cached file {name}"))?;
            if files.set_local(&name, false).await? == 0 {
                // Stray file with no catalog row; nothing to unmark.
                warn!(filename = %name, "deleted cached file unknown to ledger");
            }
            report.deleted += 1;
        }
    }

    // Pass 2: fetch what remains, one file at a time.
    for name in to_download {
        let dest = cache_dir.join(&name);
        match archive.retrieve(&name, &dest).await {
            Ok(()) => {
                if files.set_local(&name, true).await? == 0 {
                    warn!(filename = %name, "downloaded file has no ledger record");
                }
                report.downloaded += 1;
            }
            Err(err) => {
                warn!(filename = %name, %err, "transfer failed; continuing with remaining files");
                report.failed.push(name);
            }
        }
    }

    info!(
        deleted = report.deleted,
        kept = report.kept,
        downloaded = report.downloaded,
        failed = report.failed.len(),
        "cache reconciled"
    );
    Ok(report)
}
