//! Ledger store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Timestamp error: {0}")]
    Timestamp(String),
}
