//! Catalog builder: one-time ledger seeding.
//!
//! Seeds the trajectory grid over the configured date range and the met
//! file catalog from the remote archive listing. Both paths are idempotent;
//! re-running against a seeded ledger inserts nothing.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use splitflow_db::{MetFileStore, TrajectoryStore};
use tracing::{info, warn};

use crate::archive::ArchiveClient;
use crate::codec::{parse_listing_entry, MetFilename};

/// Seeding outcome counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: u64,
    pub skipped: u64,
}

/// Upsert one trajectory row per grid timestamp in `[start, end]` at
/// `step_hours` spacing (both bounds already UTC).
pub async fn seed_trajectory_grid(
    store: &TrajectoryStore,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_hours: u32,
) -> Result<SeedReport> {
    let step = Duration::hours(i64::from(step_hours));
    let mut report = SeedReport::default();

    let mut ts = start;
    while ts <= end {
        if store.seed(ts).await? {
            report.inserted += 1;
        } else {
            report.skipped += 1;
        }
        ts += step;
    }

    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "trajectory grid seeded"
    );
    Ok(report)
}

/// Enumerate the remote archive and upsert one met file row per entry
/// matching `file_tag`.
///
/// Filenames that fail to decode are skipped with a warning; a row is never
/// inserted with a guessed valid time.
pub async fn seed_met_catalog<A: ArchiveClient>(
    store: &MetFileStore,
    archive: &mut A,
    file_tag: &str,
) -> Result<SeedReport> {
    let lines = archive.list().await?;
    let mut report = SeedReport::default();

    for line in &lines {
        let Some(filename) = parse_listing_entry(line) else {
            continue;
        };
        if !filename.contains(file_tag) {
            continue;
        }

        match MetFilename::parse(filename) {
            Ok(parsed) => {
                if store.upsert_remote(filename, parsed.valid_time).await? {
                    report.inserted += 1;
                } else {
                    report.skipped += 1;
                }
            }
            Err(err) => {
                warn!(filename, %err, "unparseable archive filename skipped");
                report.skipped += 1;
            }
        }
    }

    info!(
        inserted = report.inserted,
        skipped = report.skipped,
        tag = file_tag,
        "met catalog seeded"
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use chrono::TimeZone;
    use splitflow_db::{create_pool, init_schema, DbConfig, DbPool};
    use std::path::Path;

    pub(crate) struct FakeArchive {
        pub listing: Vec<String>,
        /// Filenames whose retrieval should fail.
        pub broken: Vec<String>,
        pub retrieved: std::sync::Mutex<Vec<String>>,
    }

    impl FakeArchive {
        pub fn with_listing(listing: &[&str]) -> Self {
            Self {
                listing: listing.iter().map(|s| s.to_string()).collect(),
                broken: Vec::new(),
                retrieved: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl ArchiveClient for FakeArchive {
        async fn list(&mut self) -> Result<Vec<String>> {
            Ok(self.listing.clone())
        }

        async fn retrieve(&mut self, remote_name: &str, dest: &Path) -> Result<()> {
            if self.broken.iter().any(|b| b == remote_name) {
                return Err(anyhow!("simulated transfer failure for {remote_name}"));
            }
            std::fs::write(dest, remote_name)?;
            self.retrieved.lock().unwrap().push(remote_name.to_string());
            Ok(())
        }
    }

    async fn pool() -> DbPool {
        let pool = create_pool(DbConfig::sqlite_memory()).await.unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn grid_seeding_is_idempotent() {
        let store = TrajectoryStore::new(pool().await);
        let start = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2017, 1, 8, 0, 0, 0).unwrap();

        let first = seed_trajectory_grid(&store, start, end, 1).await.unwrap();
        assert_eq!(first.inserted, 7 * 24 + 1);
        assert_eq!(first.skipped, 0);

        let second = seed_trajectory_grid(&store, start, end, 1).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 7 * 24 + 1);
    }

    #[tokio::test]
    async fn catalog_seeding_decodes_listing() {
        let store = MetFileStore::new(pool().await);
        let mut archive = FakeArchive::with_listing(&[
            "-rw-r--r-- 1 ftp ftp 1048576 Jan 2 02:13 fc.20170102.00z.hrrra",
            "-rw-r--r-- 1 ftp ftp 1048576 Jan 2 08:13 fc.20170102.06z.hrrra",
            "-rw-r--r-- 1 ftp ftp 512 Jan 2 08:13 readme.txt",
        ]);

        let report = seed_met_catalog(&store, &mut archive, "hrrra").await.unwrap();
        assert_eq!(report.inserted, 2);

        let rec = store
            .find_by_filename("fc.20170102.00z.hrrra")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            rec.valid_time,
            Utc.with_ymd_and_hms(2017, 1, 2, 0, 0, 0).unwrap()
        );
        assert!(rec.remote_available);
        assert!(!rec.local_available);
    }

    #[tokio::test]
    async fn bad_filename_is_skipped_not_inserted() {
        let store = MetFileStore::new(pool().await);
        let mut archive = FakeArchive::with_listing(&[
            "... fc.2017010x.00z.hrrra",
            "... fc.20170102.00z.hrrra",
        ]);

        let report = seed_met_catalog(&store, &mut archive, "hrrra").await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.skipped, 1);
        assert!(store
            .find_by_filename("fc.2017010x.00z.hrrra")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn catalog_seeding_is_idempotent() {
        let store = MetFileStore::new(pool().await);
        let mut archive =
            FakeArchive::with_listing(&["... fc.20170102.00z.hrrra", "... fc.20170102.06z.hrrra"]);

        seed_met_catalog(&store, &mut archive, "hrrra").await.unwrap();
        let second = seed_met_catalog(&store, &mut archive, "hrrra").await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
