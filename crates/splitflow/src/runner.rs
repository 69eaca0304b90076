//! Trajectory runner.
//!
//! Consumes a prepared cache window: for each pending timestamp, select the
//! cached met files covering its run span, invoke the engine, and commit
//! the outcome to the ledger. One timestamp's failure never aborts the
//! rest of the window.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use splitflow_db::TrajectoryStore;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::codec::MetFilename;
use crate::engine::{EngineRequest, TrajectoryEngine};
use crate::planner::WindowPlan;

/// Per-window runner configuration, threaded explicitly (no process-wide
/// working directory).
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub name_prefix: String,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub coords: (f64, f64),
    pub altitude: f64,
    pub runtime_hours: i64,
}

/// What one window run did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// Met-file time span one trajectory needs.
///
/// Backward runs (`runtime < 0`) end 7h after the start date and begin
/// `runtime - 7h` before it; forward runs mirror that.
pub fn trajectory_window(date: DateTime<Utc>, runtime_hours: i64) -> (DateTime<Utc>, DateTime<Utc>) {
    if runtime_hours < 0 {
        (
            date + Duration::hours(runtime_hours - 7),
            date + Duration::hours(7),
        )
    } else {
        (
            date - Duration::hours(7),
            date + Duration::hours(runtime_hours + 7),
        )
    }
}

/// Cached met filenames whose encoded valid time lies in the inclusive
/// window, ascending by time. Undecodable names in the cache are ignored.
pub fn collect_met_files(
    cache_dir: &Path,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(cache_dir)
        .with_context(|| format!("Failed to scan cache directory {}", cache_dir.display()))?;

    let mut files: Vec<(DateTime<Utc>, String)> = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let Ok(parsed) = MetFilename::parse(&name) else {
            continue;
        };
        if parsed.valid_time >= window.0 && parsed.valid_time <= window.1 {
            files.push((parsed.valid_time, name));
        }
    }

    files.sort();
    Ok(files.into_iter().map(|(_, name)| name).collect())
}

/// Run every selected timestamp in the window through the engine.
pub async fn run_window<E: TrajectoryEngine>(
    plan: &WindowPlan,
    cfg: &RunnerConfig,
    engine: &E,
    trajectories: &TrajectoryStore,
) -> Result<RunReport> {
    let mut report = RunReport::default();

    for &date in &plan.selected {
        // Edge buffers can hand the same timestamp to two adjacent windows;
        // only still-pending records get a run.
        match trajectories.find_by_time(date).await? {
            None => {
                warn!(%date, "trajectory timestamp missing from ledger");
                report.skipped += 1;
                continue;
            }
            Some(rec) if rec.processed || rec.attempted => continue,
            Some(_) => {}
        }

        let window = trajectory_window(date, cfg.runtime_hours);
        let met_files = collect_met_files(&cfg.cache_dir, window)?;
        info!(%date, met_files = met_files.len(), "generating trajectory");

        let request = EngineRequest {
            name_prefix: cfg.name_prefix.clone(),
            work_dir: cfg.work_dir.clone(),
            output_dir: cfg.output_dir.clone(),
            met_dir: cfg.cache_dir.clone(),
            met_files,
            date,
            altitude: cfg.altitude,
            coords: cfg.coords,
            runtime_hours: cfg.runtime_hours,
        };

        let outcome = match engine.generate(&request).await {
            Ok(outcome) => outcome,
            Err(err) => {
                // Could not invoke the engine at all; treat like a failed
                // attempt so the record stays visible for retry.
                error!(%date, %err, "engine invocation error");
                if trajectories.mark_attempted(date).await? == 0 {
                    warn!(%date, "trajectory timestamp missing from ledger");
                    report.skipped += 1;
                } else {
                    report.failed += 1;
                }
                continue;
            }
        };

        if outcome.is_success() {
            let artifact = outcome.artifact.as_deref().unwrap_or_default();
            if trajectories.mark_processed(date, artifact).await? == 0 {
                warn!(%date, "trajectory timestamp missing from ledger");
                report.skipped += 1;
            } else {
                info!(%date, artifact, "trajectory generated");
                report.succeeded += 1;
            }
        } else {
            warn!(%date, code = outcome.code, "trajectory generation failed");
            if trajectories.mark_attempted(date).await? == 0 {
                warn!(%date, "trajectory timestamp missing from ledger");
                report.skipped += 1;
            } else {
                report.failed += 1;
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "window run complete"
    );
    Ok(report)
}
