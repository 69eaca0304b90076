//! SQLite ledger store for splitflow.
//!
//! Two tables track all pipeline state: `met_files` (one row per
//! meteorological file known to the remote archive) and `trajectories`
//! (one row per trajectory-hour the pipeline must eventually compute).
//! Every mutation commits independently so an interrupted run resumes
//! from the last committed record.

pub mod error;
pub mod files;
pub mod pool;
pub mod schema;
pub mod trajectories;

pub use error::DbError;
pub use files::{MetFileRecord, MetFileStore};
pub use pool::{create_pool, DbConfig, DbPool};
pub use schema::{init_schema, reset_schema};
pub use trajectories::{LedgerStats, TrajectoryRecord, TrajectoryStore};

use chrono::{DateTime, SecondsFormat, Utc};

/// Canonical timestamp encoding for ledger columns (RFC 3339 UTC, whole
/// seconds). Uniqueness constraints compare these strings, so every writer
/// must go through this one function.
pub fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a ledger timestamp column back into UTC.
pub fn decode_ts(raw: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::Timestamp(format!("invalid ledger timestamp '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_roundtrip_is_canonical() {
        let ts = Utc.with_ymd_and_hms(2017, 1, 2, 12, 0, 0).unwrap();
        let encoded = encode_ts(ts);
        assert_eq!(encoded, "2017-01-02T12:00:00Z");
        assert_eq!(decode_ts(&encoded).unwrap(), ts);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_ts("2017-01-02 12:00:00").is_err());
        assert!(decode_ts("").is_err());
    }
}
