//! Splitflow: scheduling and state tracking for HYSPLIT back-trajectory
//! batch runs.
//!
//! The pipeline reconciles three views of the world on every pass: the
//! ledger (what work is owed and what inputs exist), the local met-file
//! cache, and the remote archive. Interrupted runs resume from committed
//! ledger state without redoing finished work.

pub mod archive;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod engine;
pub mod pipeline;
pub mod planner;
pub mod reconciler;
pub mod runner;

pub use archive::{ArchiveClient, FtpArchive};
pub use catalog::{seed_met_catalog, seed_trajectory_grid, SeedReport};
pub use codec::{parse_listing_entry, CodecError, MetFilename};
pub use config::Config;
pub use engine::{CommandEngine, EngineOutcome, EngineRequest, TrajectoryEngine};
pub use pipeline::{run_pipeline, PipelineReport};
pub use planner::{plan_windows, WindowParams, WindowPlan};
pub use reconciler::{reconcile, required_filenames, ReconcileReport};
pub use runner::{collect_met_files, run_window, trajectory_window, RunReport, RunnerConfig};
