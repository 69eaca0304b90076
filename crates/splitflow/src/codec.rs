//! Met filename codec.
//!
//! Archive filenames follow a fixed dot-delimited encoding:
//! `<prefix>.<yyyymmdd>.<hhz>.<suffix>`, e.g. `fc.20170102.00z.arl` for
//! 2017-01-02T00:00:00Z. All filename parsing in the pipeline goes through
//! this module; nothing else splits these strings.

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("expected 4 dot-delimited tokens, found {found} in '{name}'")]
    TokenCount { name: String, found: usize },

    #[error("invalid date token '{token}' in '{name}'")]
    BadDate { name: String, token: String },

    #[error("invalid hour token '{token}' in '{name}' (expected e.g. '00z')")]
    BadHour { name: String, token: String },
}

/// A decoded met filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetFilename {
    pub prefix: String,
    pub valid_time: DateTime<Utc>,
    pub suffix: String,
}

impl MetFilename {
    /// Decode `<prefix>.<yyyymmdd>.<hhz>.<suffix>`.
    pub fn parse(name: &str) -> Result<Self, CodecError> {
        let tokens: Vec<&str> = name.split('.').collect();
        if tokens.len() != 4 {
            return Err(CodecError::TokenCount {
                name: name.to_string(),
                found: tokens.len(),
            });
        }

        let date = NaiveDate::parse_from_str(tokens[1], "%Y%m%d").map_err(|_| {
            CodecError::BadDate {
                name: name.to_string(),
                token: tokens[1].to_string(),
            }
        })?;

        let hour_token = tokens[2];
        let hour: u32 = hour_token
            .strip_suffix('z')
            .and_then(|h| h.parse().ok())
            .filter(|h| *h < 24)
            .ok_or_else(|| CodecError::BadHour {
                name: name.to_string(),
                token: hour_token.to_string(),
            })?;

        let valid_time = date
            .and_hms_opt(hour, 0, 0)
            .expect("hour < 24 always forms a valid time")
            .and_utc();

        Ok(Self {
            prefix: tokens[0].to_string(),
            valid_time,
            suffix: tokens[3].to_string(),
        })
    }

    /// Encode back to the archive filename form.
    pub fn encode(&self) -> String {
        format!(
            "{}.{}.{}z.{}",
            self.prefix,
            self.valid_time.format("%Y%m%d"),
            self.valid_time.format("%H"),
            self.suffix
        )
    }
}

/// Extract the filename from a raw directory-listing line: the last
/// whitespace-separated token. Returns None for blank lines.
pub fn parse_listing_entry(line: &str) -> Option<&str> {
    line.split_whitespace().last()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_archive_filename() {
        let parsed = MetFilename::parse("fc.20170102.00z.arl").unwrap();
        assert_eq!(parsed.prefix, "fc");
        assert_eq!(parsed.suffix, "arl");
        assert_eq!(
            parsed.valid_time,
            Utc.with_ymd_and_hms(2017, 1, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn encode_inverts_parse() {
        let name = "hysplit.20170315.18z.hrrra";
        let parsed = MetFilename::parse(name).unwrap();
        assert_eq!(parsed.encode(), name);
    }

    #[test]
    fn rejects_wrong_token_count() {
        assert_eq!(
            MetFilename::parse("readme.txt"),
            Err(CodecError::TokenCount {
                name: "readme.txt".to_string(),
                found: 2,
            })
        );
    }

    #[test]
    fn rejects_bad_date() {
        assert!(matches!(
            MetFilename::parse("fc.2017010.00z.arl"),
            Err(CodecError::BadDate { .. })
        ));
        assert!(matches!(
            MetFilename::parse("fc.20171341.00z.arl"),
            Err(CodecError::BadDate { .. })
        ));
    }

    #[test]
    fn rejects_bad_hour() {
        assert!(matches!(
            MetFilename::parse("fc.20170102.25z.arl"),
            Err(CodecError::BadHour { .. })
        ));
        assert!(matches!(
            MetFilename::parse("fc.20170102.00.arl"),
            Err(CodecError::BadHour { .. })
        ));
    }

    #[test]
    fn listing_entry_is_last_token() {
        let line = "-rw-r--r--  1 ftp ftp  1048576 Jan  2 02:13 fc.20170102.00z.arl";
        assert_eq!(parse_listing_entry(line), Some("fc.20170102.00z.arl"));
        assert_eq!(parse_listing_entry("   "), None);
    }
}
