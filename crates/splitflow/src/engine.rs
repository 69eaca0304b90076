//! External trajectory engine boundary.
//!
//! The engine is a black box: given met files and a start time/location/
//! altitude it either produces a named artifact or fails with a non-zero
//! code. A non-zero code is a normal outcome, not an `Err`; `Err` is
//! reserved for failing to invoke the engine at all.

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

/// Everything one engine invocation needs.
#[derive(Debug, Clone)]
pub struct EngineRequest {
    pub name_prefix: String,
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub met_dir: PathBuf,
    /// Met filenames within `met_dir`, ascending by valid time.
    pub met_files: Vec<String>,
    pub date: DateTime<Utc>,
    pub altitude: f64,
    pub coords: (f64, f64),
    pub runtime_hours: i64,
}

/// What the engine reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    /// Artifact name; set exactly when `code == 0`.
    pub artifact: Option<String>,
    pub code: i32,
}

impl EngineOutcome {
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

pub trait TrajectoryEngine {
    fn generate(
        &self,
        request: &EngineRequest,
    ) -> impl std::future::Future<Output = Result<EngineOutcome>> + Send;
}

/// Engine adapter that spawns an external executable.
///
/// Arguments mirror the engine interface: prefix, working/output/met dirs,
/// comma-joined met file list, calendar fields, altitude, coordinates,
/// runtime. The artifact name is the last non-empty stdout line.
pub struct CommandEngine {
    program: PathBuf,
}

impl CommandEngine {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl TrajectoryEngine for CommandEngine {
    async fn generate(&self, request: &EngineRequest) -> Result<EngineOutcome> {
        let date = request.date;
        let output = Command::new(&self.program)
            .arg(&request.name_prefix)
            .arg(&request.work_dir)
            .arg(&request.output_dir)
            .arg(&request.met_dir)
            .arg(request.met_files.join(","))
            .arg(date.year().to_string())
            .arg(date.month().to_string())
            .arg(date.day().to_string())
            .arg(date.hour().to_string())
            .arg(request.altitude.to_string())
            .arg(request.coords.0.to_string())
            .arg(request.coords.1.to_string())
            .arg(request.runtime_hours.to_string())
            .output()
            .await
            .with_context(|| format!("Failed to spawn engine {}", self.program.display()))?;

        let code = output.status.code().unwrap_or(-1);
        debug!(code, date = %date, "engine invocation returned");

        if code != 0 {
            return Ok(EngineOutcome {
                artifact: None,
                code,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let artifact = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string);

        match artifact {
            Some(name) => Ok(EngineOutcome {
                artifact: Some(name),
                code: 0,
            }),
            // Success with no artifact name is an engine contract breach.
            None => Ok(EngineOutcome {
                artifact: None,
                code: -1,
            }),
        }
    }
}
