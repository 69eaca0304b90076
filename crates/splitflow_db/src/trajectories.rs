//! Trajectory ledger: one row per trajectory-hour the pipeline owes.
//!
//! State machine per row:
//!   seeded      -> processed=0, attempted=0, output_name NULL
//!   run success -> processed=1, attempted=0, output_name set
//!   run failure -> processed=0, attempted=1, output_name NULL
//!
//! Only untouched rows (`processed=0 AND attempted=0`) are pending; failed
//! rows stay visible to operators until explicitly requeued, so the default
//! selection never silently retries them.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;

use crate::{decode_ts, encode_ts, DbError, DbPool};

#[derive(Debug, FromRow)]
struct TrajectoryRow {
    id: i64,
    valid_time: String,
    output_name: Option<String>,
    processed: bool,
    attempted: bool,
}

/// One trajectory-hour the system must eventually compute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrajectoryRecord {
    pub id: i64,
    pub valid_time: DateTime<Utc>,
    pub output_name: Option<String>,
    pub processed: bool,
    pub attempted: bool,
}

impl TrajectoryRecord {
    fn from_row(row: TrajectoryRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id,
            valid_time: decode_ts(&row.valid_time)?,
            output_name: row.output_name,
            processed: row.processed,
            attempted: row.attempted,
        })
    }
}

/// Ledger-wide progress counts.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct LedgerStats {
    pub pending: i64,
    pub processed: i64,
    pub attempted: i64,
    pub total: i64,
}

pub struct TrajectoryStore {
    pool: DbPool,
}

impl TrajectoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Seed one target timestamp, untouched. Idempotent on `valid_time`;
    /// returns whether a new row was inserted.
    pub async fn seed(&self, valid_time: DateTime<Utc>) -> Result<bool, DbError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO trajectories (valid_time, processed, attempted)
            VALUES (?, 0, 0)
            ON CONFLICT(valid_time) DO NOTHING
            "#,
        )
        .bind(encode_ts(valid_time))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    /// Timestamps still owed: never run and never failed, ascending.
    pub async fn pending(&self) -> Result<Vec<TrajectoryRecord>, DbError> {
        let rows: Vec<TrajectoryRow> = sqlx::query_as(
            r#"
            SELECT * FROM trajectories
            WHERE processed = 0 AND attempted = 0
            ORDER BY valid_time ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TrajectoryRecord::from_row).collect()
    }

    pub async fn find_by_time(
        &self,
        valid_time: DateTime<Utc>,
    ) -> Result<Option<TrajectoryRecord>, DbError> {
        let row: Option<TrajectoryRow> =
            sqlx::query_as("SELECT * FROM trajectories WHERE valid_time = ?")
                .bind(encode_ts(valid_time))
                .fetch_optional(&self.pool)
                .await?;

        row.map(TrajectoryRecord::from_row).transpose()
    }

    /// Record a successful generation: processed, not attempted, named.
    ///
    /// Returns rows affected; zero means the timestamp was never seeded
    /// (a ledger inconsistency the runner logs and skips).
    pub async fn mark_processed(
        &self,
        valid_time: DateTime<Utc>,
        output_name: &str,
    ) -> Result<u64, DbError> {
        let affected = sqlx::query(
            r#"
            UPDATE trajectories
            SET processed = 1, attempted = 0, output_name = ?
            WHERE valid_time = ?
            "#,
        )
        .bind(output_name)
        .bind(encode_ts(valid_time))
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(%valid_time, output_name, "trajectory marked processed");
        Ok(affected)
    }

    /// Record a failed generation attempt: retryable, but excluded from the
    /// pending selection until an operator requeues it.
    pub async fn mark_attempted(&self, valid_time: DateTime<Utc>) -> Result<u64, DbError> {
        let affected = sqlx::query(
            r#"
            UPDATE trajectories
            SET processed = 0, attempted = 1, output_name = NULL
            WHERE valid_time = ?
            "#,
        )
        .bind(encode_ts(valid_time))
        .execute(&self.pool)
        .await?
        .rows_affected();

        debug!(%valid_time, "trajectory marked attempted");
        Ok(affected)
    }

    /// Return failed rows to the pending pool for a retry pass.
    pub async fn requeue_attempted(&self) -> Result<u64, DbError> {
        let affected =
            sqlx::query("UPDATE trajectories SET attempted = 0 WHERE attempted = 1 AND processed = 0")
                .execute(&self.pool)
                .await?
                .rows_affected();
        Ok(affected)
    }

    pub async fn stats(&self) -> Result<LedgerStats, DbError> {
        let stats: LedgerStats = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE processed = 0 AND attempted = 0) AS pending,
                COUNT(*) FILTER (WHERE processed = 1) AS processed,
                COUNT(*) FILTER (WHERE attempted = 1) AS attempted,
                COUNT(*) AS total
            FROM trajectories
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, init_schema, DbConfig};
    use chrono::TimeZone;

    async fn setup() -> TrajectoryStore {
        let pool = create_pool(DbConfig::sqlite_memory()).await.unwrap();
        init_schema(&pool).await.unwrap();
        TrajectoryStore::new(pool)
    }

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 1, 2, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let store = setup().await;
        assert!(store.seed(hour(0)).await.unwrap());
        assert!(!store.seed(hour(0)).await.unwrap());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.pending, 1);
    }

    #[tokio::test]
    async fn success_sets_exactly_processed() {
        let store = setup().await;
        store.seed(hour(12)).await.unwrap();

        let affected = store.mark_processed(hour(12), "traj_out_001").await.unwrap();
        assert_eq!(affected, 1);

        let rec = store.find_by_time(hour(12)).await.unwrap().unwrap();
        assert!(rec.processed);
        assert!(!rec.attempted);
        assert_eq!(rec.output_name.as_deref(), Some("traj_out_001"));
        assert!(store.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_sets_exactly_attempted() {
        let store = setup().await;
        store.seed(hour(12)).await.unwrap();

        store.mark_attempted(hour(12)).await.unwrap();

        let rec = store.find_by_time(hour(12)).await.unwrap().unwrap();
        assert!(!rec.processed);
        assert!(rec.attempted);
        assert!(rec.output_name.is_none());
        // Failed rows are excluded from the default pending selection.
        assert!(store.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fresh_success_clears_attempted() {
        let store = setup().await;
        store.seed(hour(12)).await.unwrap();
        store.mark_attempted(hour(12)).await.unwrap();
        store.mark_processed(hour(12), "traj_out_002").await.unwrap();

        let rec = store.find_by_time(hour(12)).await.unwrap().unwrap();
        assert!(rec.processed);
        assert!(!rec.attempted);
    }

    #[tokio::test]
    async fn requeue_restores_pending() {
        let store = setup().await;
        store.seed(hour(1)).await.unwrap();
        store.seed(hour(2)).await.unwrap();
        store.mark_attempted(hour(1)).await.unwrap();
        store.mark_processed(hour(2), "done").await.unwrap();

        assert_eq!(store.requeue_attempted().await.unwrap(), 1);

        let pending = store.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].valid_time, hour(1));
    }

    #[tokio::test]
    async fn update_on_unseeded_timestamp_touches_nothing() {
        let store = setup().await;
        assert_eq!(store.mark_processed(hour(3), "x").await.unwrap(), 0);
        assert_eq!(store.mark_attempted(hour(3)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn pending_is_ordered() {
        let store = setup().await;
        store.seed(hour(5)).await.unwrap();
        store.seed(hour(1)).await.unwrap();
        store.seed(hour(3)).await.unwrap();

        let pending = store.pending().await.unwrap();
        let times: Vec<_> = pending.iter().map(|r| r.valid_time).collect();
        assert_eq!(times, vec![hour(1), hour(3), hour(5)]);
    }
}
