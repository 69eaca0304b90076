//! Ledger schema.
//!
//! `met_files.filename` and `trajectories.valid_time` carry the uniqueness
//! constraints the seeding paths rely on for idempotence. Records are never
//! deleted outside of an explicit operator reset.

use crate::{DbError, DbPool};

const CREATE_MET_FILES: &str = r#"
CREATE TABLE IF NOT EXISTS met_files (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    filename         TEXT NOT NULL UNIQUE,
    valid_time       TEXT NOT NULL,
    local_available  INTEGER NOT NULL DEFAULT 0,
    remote_available INTEGER NOT NULL DEFAULT 0
)
"#;

const CREATE_TRAJECTORIES: &str = r#"
CREATE TABLE IF NOT EXISTS trajectories (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    valid_time  TEXT NOT NULL UNIQUE,
    output_name TEXT,
    processed   INTEGER NOT NULL DEFAULT 0,
    attempted   INTEGER NOT NULL DEFAULT 0
)
"#;

/// Create both ledger tables if they do not exist yet.
pub async fn init_schema(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query(CREATE_MET_FILES).execute(pool).await?;
    sqlx::query(CREATE_TRAJECTORIES).execute(pool).await?;
    Ok(())
}

/// Drop and recreate both tables, discarding all recorded work.
///
/// Callers must gate this behind operator confirmation; the store itself
/// performs no prompting.
pub async fn reset_schema(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query("DROP TABLE IF EXISTS met_files")
        .execute(pool)
        .await?;
    sqlx::query("DROP TABLE IF EXISTS trajectories")
        .execute(pool)
        .await?;
    init_schema(pool).await
}
