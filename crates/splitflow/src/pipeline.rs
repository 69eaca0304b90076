//! Batch pipeline orchestration.
//!
//! One pass: read pending work, plan windows, and for each window fully
//! reconcile the cache before generating anything. Re-running after an
//! interruption only touches records still pending and files still
//! missing, so the loop is re-entrant.

use anyhow::Result;
use splitflow_db::{DbPool, MetFileStore, TrajectoryStore};
use tracing::info;

use crate::archive::ArchiveClient;
use crate::config::Config;
use crate::engine::TrajectoryEngine;
use crate::planner::{plan_windows, WindowParams};
use crate::reconciler::{reconcile, required_filenames, ReconcileReport};
use crate::runner::{run_window, RunReport, RunnerConfig};

/// Totals across every window of one pipeline pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub windows: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
    pub transfer_failures: u64,
}

impl PipelineReport {
    fn absorb(&mut self, cache: &ReconcileReport, run: &RunReport) {
        self.windows += 1;
        self.succeeded += run.succeeded;
        self.failed += run.failed;
        self.skipped += run.skipped;
        self.transfer_failures += cache.failed.len() as u64;
    }
}

/// Run one full pipeline pass over all pending trajectory timestamps.
pub async fn run_pipeline<A, E>(
    cfg: &Config,
    pool: &DbPool,
    archive: &mut A,
    engine: &E,
) -> Result<PipelineReport>
where
    A: ArchiveClient,
    E: TrajectoryEngine,
{
    let trajectories = TrajectoryStore::new(pool.clone());
    let files = MetFileStore::new(pool.clone());

    let pending: Vec<_> = trajectories
        .pending()
        .await?
        .into_iter()
        .map(|rec| rec.valid_time)
        .collect();

    if pending.is_empty() {
        info!("no pending trajectories; nothing to do");
        return Ok(PipelineReport::default());
    }

    let params = WindowParams {
        period_days: cfg.window.period_days,
        edge_buffer_hours: cfg.window.edge_buffer_hours,
        met_buffer_factor: cfg.window.met_buffer_factor,
        runtime_hours: cfg.runtime_hours,
    };
    let plans = plan_windows(&pending, &params);
    info!(
        pending = pending.len(),
        windows = plans.len(),
        "planned batch windows"
    );

    let runner_cfg = RunnerConfig {
        name_prefix: cfg.name_prefix.clone(),
        work_dir: cfg.engine_work_dir.clone(),
        output_dir: cfg.output_dir.clone(),
        cache_dir: cfg.cache_dir.clone(),
        coords: cfg.coords,
        altitude: cfg.altitude,
        runtime_hours: cfg.runtime_hours,
    };

    let mut report = PipelineReport::default();
    let remote_files = files.list_remote().await?;

    for plan in &plans {
        info!(
            period_start = %plan.period_start,
            period_end = %plan.period_end,
            trajectories = plan.selected.len(),
            "processing window"
        );

        let required = required_filenames(&remote_files, plan.met_span);
        let cache_report = reconcile(&cfg.cache_dir, &required, archive, &files).await?;
        let run_report = run_window(plan, &runner_cfg, engine, &trajectories).await?;
        report.absorb(&cache_report, &run_report);
    }

    info!(
        windows = report.windows,
        succeeded = report.succeeded,
        failed = report.failed,
        "pipeline pass complete"
    );
    Ok(report)
}
