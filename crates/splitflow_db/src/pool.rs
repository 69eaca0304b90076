//! Ledger pool creation.
//!
//! The ledger is a single SQLite file (or `:memory:` in tests). Concrete
//! pool types keep `#[derive(FromRow)]` working with typed columns.

use tracing::info;

use crate::DbError;

/// Ledger pool type alias.
pub type DbPool = sqlx::SqlitePool;

/// Ledger connection configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite connection URL
    pub url: String,
    /// Maximum connections in the pool
    pub max_connections: u32,
}

impl DbConfig {
    /// Configuration for an on-disk ledger, creating the file if absent.
    pub fn sqlite(path: impl AsRef<str>) -> Self {
        Self {
            url: format!("sqlite:{}?mode=rwc", path.as_ref()),
            max_connections: 5,
        }
    }

    /// In-memory ledger (for testing).
    pub fn sqlite_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Create the ledger pool and apply SQLite pragmas.
///
/// Connection failure is fatal to the run; everything downstream assumes a
/// working pool.
pub async fn create_pool(config: DbConfig) -> Result<DbPool, DbError> {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    apply_sqlite_pragmas(&pool).await?;

    info!("Connected to ledger at {}", config.url);
    Ok(pool)
}

/// WAL mode so readers never block the single writer; NORMAL sync keeps the
/// per-record commits cheap.
async fn apply_sqlite_pragmas(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(pool)
        .await?;
    Ok(())
}
