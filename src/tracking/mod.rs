//! Experiment tracking
//!
//! The trainer records one run per invocation through the [`ExperimentSink`]
//! trait. Two sinks are provided:
//! - [`LocalTracker`]: runs and artifacts kept on the local filesystem
//! - [`MlflowTracker`]: an MLflow tracking server over its REST API

mod config;
mod mlflow;
mod storage;
mod tracker;

pub use config::TrackingConfig;
pub use mlflow::MlflowTracker;
pub use storage::LocalStorage;
pub use tracker::{Experiment, LocalTracker, Metric, Run};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Terminal or in-progress state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
    Killed,
}

impl RunStatus {
    /// Wire name used by MLflow
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
            RunStatus::Killed => "KILLED",
        }
    }
}

/// Destination for run parameters, metrics and artifacts
pub trait ExperimentSink: Send + Sync {
    /// Open a run and return its id
    fn start_run(&self, run_name: &str) -> Result<String>;

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()>;

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()>;

    /// Attach the file at `local_path` to the run under `category`
    fn log_artifact(&self, run_id: &str, local_path: &Path, category: &str) -> Result<()>;

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()>;
}

impl<T: ExperimentSink + ?Sized> ExperimentSink for Arc<T> {
    fn start_run(&self, run_name: &str) -> Result<String> {
        (**self).start_run(run_name)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        (**self).log_param(run_id, key, value)
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        (**self).log_metric(run_id, key, value)
    }

    fn log_artifact(&self, run_id: &str, local_path: &Path, category: &str) -> Result<()> {
        (**self).log_artifact(run_id, local_path, category)
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        (**self).end_run(run_id, status)
    }
}
