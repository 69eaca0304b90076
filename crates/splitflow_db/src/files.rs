//! Met file catalog: one row per file known to the remote archive.
//!
//! Rows are created once during catalog seeding and only ever have their
//! availability flags updated afterward.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::debug;

use crate::{decode_ts, encode_ts, DbError, DbPool};

/// Raw row shape; timestamps are parsed at the boundary.
#[derive(Debug, FromRow)]
struct MetFileRow {
    id: i64,
    filename: String,
    valid_time: String,
    local_available: bool,
    remote_available: bool,
}

/// One meteorological input file known to the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetFileRecord {
    pub id: i64,
    pub filename: String,
    pub valid_time: DateTime<Utc>,
    pub local_available: bool,
    pub remote_available: bool,
}

impl MetFileRecord {
    fn from_row(row: MetFileRow) -> Result<Self, DbError> {
        Ok(Self {
            id: row.id,
            filename: row.filename,
            valid_time: decode_ts(&row.valid_time)?,
            local_available: row.local_available,
            remote_available: row.remote_available,
        })
    }
}

pub struct MetFileStore {
    pool: DbPool,
}

impl MetFileStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Register a file seen in the remote archive listing.
    ///
    /// Idempotent on `filename`: re-seeding an already-cataloged file is a
    /// no-op. Returns whether a new row was inserted.
    pub async fn upsert_remote(
        &self,
        filename: &str,
        valid_time: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO met_files (filename, valid_time, local_available, remote_available)
            VALUES (?, ?, 0, 1)
            ON CONFLICT(filename) DO NOTHING
            "#,
        )
        .bind(filename)
        .bind(encode_ts(valid_time))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(inserted > 0)
    }

    /// All files the remote archive is known to hold, ascending by time.
    pub async fn list_remote(&self) -> Result<Vec<MetFileRecord>, DbError> {
        let rows: Vec<MetFileRow> = sqlx::query_as(
            "SELECT * FROM met_files WHERE remote_available = 1 ORDER BY valid_time ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MetFileRecord::from_row).collect()
    }

    pub async fn find_by_filename(&self, filename: &str) -> Result<Option<MetFileRecord>, DbError> {
        let row: Option<MetFileRow> = sqlx::query_as("SELECT * FROM met_files WHERE filename = ?")
            .bind(filename)
            .fetch_optional(&self.pool)
            .await?;

        row.map(MetFileRecord::from_row).transpose()
    }

    /// Flip the local-availability flag after a download or delete.
    ///
    /// Returns the number of rows touched; zero means no catalog row matches
    /// the filename, which callers surface as a ledger inconsistency.
    pub async fn set_local(&self, filename: &str, local: bool) -> Result<u64, DbError> {
        let affected = sqlx::query("UPDATE met_files SET local_available = ? WHERE filename = ?")
            .bind(local)
            .bind(filename)
            .execute(&self.pool)
            .await?
            .rows_affected();

        debug!(filename, local, "met file flag updated");
        Ok(affected)
    }

    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM met_files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
