//! Run configuration.
//!
//! Loaded from a TOML file; every field has a default matching the original
//! HRRR back-trajectory campaign so a bare `splitflow run` in a prepared
//! directory works. Unparseable values are fatal: the pipeline never guesses
//! at a date range.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// SQLite ledger path.
    pub db_path: PathBuf,
    /// Local met-file cache directory (strictly windowed).
    pub cache_dir: PathBuf,
    /// Directory the engine writes trajectory artifacts into.
    pub output_dir: PathBuf,
    /// HYSPLIT working directory handed to the engine.
    pub engine_work_dir: PathBuf,
    /// External trajectory engine executable.
    pub engine_program: PathBuf,
    /// Prefix for generated artifact names.
    pub name_prefix: String,
    /// Trajectory run length in hours; negative means backward.
    pub runtime_hours: i64,
    /// Parcel start latitude/longitude.
    pub coords: (f64, f64),
    /// Parcel start altitude (meters AGL).
    pub altitude: f64,
    pub remote: RemoteConfig,
    pub grid: GridConfig,
    pub window: WindowConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteConfig {
    /// FTP host of the met archive.
    pub host: String,
    /// Directory on the archive holding the met files.
    pub dir: String,
    /// Substring a listing entry must contain to be cataloged.
    pub file_tag: String,
    /// Per-transfer timeout; a stalled transfer is a per-file failure.
    pub transfer_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Inclusive grid start, RFC 3339 with offset (converted to UTC).
    pub start: String,
    /// Inclusive grid end, RFC 3339 with offset.
    pub end: String,
    /// Grid spacing in hours.
    pub step_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowConfig {
    /// Calendar period length for batch windows.
    pub period_days: u32,
    /// Selection buffer on each period edge, hours.
    pub edge_buffer_hours: i64,
    /// Met span buffer as a multiple of |runtime|.
    pub met_buffer_factor: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("splitflow_runs.sqlite"),
            cache_dir: PathBuf::from("met/hrrr"),
            output_dir: PathBuf::from("trajectories"),
            engine_work_dir: PathBuf::from("hysplit/working"),
            engine_program: PathBuf::from("generate_singletraj"),
            name_prefix: "fc_csu_12hr_".to_string(),
            runtime_hours: -12,
            coords: (40.07, -105.22),
            altitude: 5.0,
            remote: RemoteConfig::default(),
            grid: GridConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "arlftp.arlhq.noaa.gov".to_string(),
            dir: "/archives/hrrr/".to_string(),
            file_tag: "hrrra".to_string(),
            transfer_timeout_secs: 60,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            start: "2017-01-01T00:00:00-07:00".to_string(),
            end: "2018-01-01T00:00:00-07:00".to_string(),
            step_hours: 1,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            period_days: 7,
            edge_buffer_hours: 8,
            met_buffer_factor: 2,
        }
    }
}

impl Config {
    /// Load from a TOML file, or fall back to defaults when `path` is None.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let (start, end) = self.grid_bounds()?;
        anyhow::ensure!(start <= end, "grid start {} is after grid end {}", start, end);
        anyhow::ensure!(self.grid.step_hours > 0, "grid step_hours must be positive");
        anyhow::ensure!(self.window.period_days > 0, "window period_days must be positive");
        Ok(())
    }

    /// Grid bounds converted to UTC.
    pub fn grid_bounds(&self) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        Ok((
            parse_grid_bound(&self.grid.start)?,
            parse_grid_bound(&self.grid.end)?,
        ))
    }
}

fn parse_grid_bound(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Invalid grid timestamp '{raw}' (expected RFC 3339)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn defaults_validate() {
        let cfg = Config::default();
        cfg.validate().unwrap();

        // MST offset converts to UTC.
        let (start, _) = cfg.grid_bounds().unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2017, 1, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn loads_partial_toml_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splitflow.toml");
        std::fs::write(
            &path,
            r#"
runtime_hours = 24

[grid]
start = "2020-06-01T00:00:00Z"
end = "2020-06-08T00:00:00Z"
step_hours = 3
"#,
        )
        .unwrap();

        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.runtime_hours, 24);
        assert_eq!(cfg.grid.step_hours, 3);
        // Untouched sections keep their defaults.
        assert_eq!(cfg.remote.file_tag, "hrrra");
        assert_eq!(cfg.window.edge_buffer_hours, 8);
    }

    #[test]
    fn bad_grid_timestamp_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splitflow.toml");
        std::fs::write(&path, "[grid]\nstart = \"yesterday\"\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn inverted_grid_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("splitflow.toml");
        std::fs::write(
            &path,
            "[grid]\nstart = \"2020-06-08T00:00:00Z\"\nend = \"2020-06-01T00:00:00Z\"\n",
        )
        .unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
