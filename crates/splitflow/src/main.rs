//! Splitflow: HYSPLIT back-trajectory scheduling pipeline.
//!
//! Usage:
//!     splitflow seed [--reset] [--config splitflow.toml]
//!     splitflow run [--config splitflow.toml]
//!     splitflow status [--config splitflow.toml]

use anyhow::Result;
use clap::{Parser, Subcommand};
use splitflow::{
    run_pipeline, seed_met_catalog, seed_trajectory_grid, CommandEngine, Config, FtpArchive,
};
use splitflow_db::{create_pool, init_schema, reset_schema, DbConfig, MetFileStore, TrajectoryStore};
use splitflow_logging::{init_logging, LogConfig};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "splitflow", about = "Schedules and tracks HYSPLIT back-trajectory runs")]
struct Cli {
    /// TOML config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mirror the full log stream to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the ledger: trajectory grid plus remote met catalog
    Seed {
        /// Drop all recorded work first (asks for confirmation)
        #[arg(long)]
        reset: bool,
    },
    /// Process all pending trajectories window by window
    Run,
    /// Show ledger progress counts
    Status,
    /// Return failed trajectories to the pending pool
    Requeue,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(LogConfig {
        app_name: "splitflow",
        verbose: cli.verbose,
    })?;

    let cfg = Config::load(cli.config.as_deref())?;
    let pool = create_pool(DbConfig::sqlite(cfg.db_path.to_string_lossy())).await?;

    match cli.command {
        Command::Seed { reset } => {
            if reset {
                if !confirm_reset()? {
                    println!("Reset not confirmed; ledger untouched.");
                    return Ok(());
                }
                reset_schema(&pool).await?;
                info!("ledger reset");
            }
            init_schema(&pool).await?;

            let (start, end) = cfg.grid_bounds()?;
            let trajectories = TrajectoryStore::new(pool.clone());
            let grid_report =
                seed_trajectory_grid(&trajectories, start, end, cfg.grid.step_hours).await?;

            let files = MetFileStore::new(pool.clone());
            let mut archive = FtpArchive::new(
                cfg.remote.host.as_str(),
                cfg.remote.dir.as_str(),
                Duration::from_secs(cfg.remote.transfer_timeout_secs),
            );
            let catalog_report = seed_met_catalog(&files, &mut archive, &cfg.remote.file_tag).await?;

            println!(
                "Seeded {} trajectory hours ({} already present) and {} met files ({} skipped).",
                grid_report.inserted,
                grid_report.skipped,
                catalog_report.inserted,
                catalog_report.skipped
            );
        }
        Command::Run => {
            init_schema(&pool).await?;
            let mut archive = FtpArchive::new(
                cfg.remote.host.as_str(),
                cfg.remote.dir.as_str(),
                Duration::from_secs(cfg.remote.transfer_timeout_secs),
            );
            let engine = CommandEngine::new(&cfg.engine_program);
            let report = run_pipeline(&cfg, &pool, &mut archive, &engine).await?;
            println!(
                "Processed {} windows: {} trajectories generated, {} failed, {} skipped.",
                report.windows, report.succeeded, report.failed, report.skipped
            );
        }
        Command::Status => {
            init_schema(&pool).await?;
            let stats = TrajectoryStore::new(pool.clone()).stats().await?;
            let file_count = MetFileStore::new(pool).count().await?;
            println!("Trajectories: {} total", stats.total);
            println!("  pending:   {}", stats.pending);
            println!("  processed: {}", stats.processed);
            println!("  attempted: {}", stats.attempted);
            println!("Met files cataloged: {file_count}");
        }
        Command::Requeue => {
            init_schema(&pool).await?;
            let requeued = TrajectoryStore::new(pool).requeue_attempted().await?;
            println!("Requeued {requeued} failed trajectories.");
        }
    }

    Ok(())
}

/// Destructive-reset confirmation: proceeds only on an exact `yes`.
fn confirm_reset() -> Result<bool> {
    print!("Reset the ledger? This discards all recorded work. Type 'yes' to continue: ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "yes")
}
