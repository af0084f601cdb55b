//! In-process experiment tracker backed by [`LocalStorage`]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::storage::LocalStorage;
use super::{ExperimentSink, RunStatus};
use crate::error::{Result, TrainerError};

/// A single logged metric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub step: u64,
    /// Unix time in milliseconds
    pub timestamp: i64,
}

/// A run within an experiment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub params: BTreeMap<String, String>,
    /// Latest value per metric
    pub metrics: BTreeMap<String, f64>,
    pub metrics_history: Vec<Metric>,
    /// Stored artifact paths
    pub artifacts: Vec<PathBuf>,
    pub status: RunStatus,
}

impl Run {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4().simple().to_string(),
            run_name: run_name.into(),
            start_time: Utc::now().timestamp_millis(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            metrics_history: Vec::new(),
            artifacts: Vec::new(),
            status: RunStatus::Running,
        }
    }
}

/// An experiment containing multiple runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub experiment_id: String,
    pub name: String,
    pub created_at: i64,
    pub runs: Vec<Run>,
    pub tags: BTreeMap<String, String>,
}

impl Experiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            experiment_id: Uuid::new_v4().simple().to_string(),
            name: name.into(),
            created_at: Utc::now().timestamp_millis(),
            runs: Vec::new(),
            tags: BTreeMap::new(),
        }
    }
}

/// Tracker that keeps runs in memory while open and persists the experiment
/// to disk whenever a run ends.
pub struct LocalTracker {
    storage: LocalStorage,
    experiment: RwLock<Experiment>,
    active_runs: RwLock<BTreeMap<String, Run>>,
}

impl LocalTracker {
    /// Open (or create) `experiment_name` under `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>, experiment_name: &str) -> Result<Self> {
        let storage = LocalStorage::new(output_dir)?;
        let experiment = match storage.load_experiment(experiment_name)? {
            Some(existing) => existing,
            None => {
                let created = Experiment::new(experiment_name);
                storage.save_experiment(&created)?;
                created
            }
        };

        info!(
            experiment = %experiment.name,
            dir = %storage.base_dir().display(),
            "Local tracking initialized"
        );

        Ok(Self {
            storage,
            experiment: RwLock::new(experiment),
            active_runs: RwLock::new(BTreeMap::new()),
        })
    }

    /// Snapshot of the experiment including all ended runs
    pub fn experiment(&self) -> Experiment {
        self.experiment.read().clone()
    }

    /// Ended runs, oldest first
    pub fn runs(&self) -> Vec<Run> {
        self.experiment.read().runs.clone()
    }

    pub fn active_run_count(&self) -> usize {
        self.active_runs.read().len()
    }

    fn with_run<R>(&self, run_id: &str, f: impl FnOnce(&mut Run) -> R) -> Result<R> {
        let mut runs = self.active_runs.write();
        let run = runs
            .get_mut(run_id)
            .ok_or_else(|| TrainerError::TrackingError(format!("no active run with id {}", run_id)))?;
        Ok(f(run))
    }
}

impl ExperimentSink for LocalTracker {
    fn start_run(&self, run_name: &str) -> Result<String> {
        let run = Run::new(run_name);
        let run_id = run.run_id.clone();
        self.active_runs.write().insert(run_id.clone(), run);
        debug!(run_id = %run_id, run_name, "Run started");
        Ok(run_id)
    }

    fn log_param(&self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.with_run(run_id, |run| {
            run.params.insert(key.to_string(), value.to_string());
        })
    }

    fn log_metric(&self, run_id: &str, key: &str, value: f64) -> Result<()> {
        self.with_run(run_id, |run| {
            run.metrics.insert(key.to_string(), value);
            run.metrics_history.push(Metric {
                name: key.to_string(),
                value,
                step: 0,
                timestamp: Utc::now().timestamp_millis(),
            });
        })
    }

    fn log_artifact(&self, run_id: &str, local_path: &Path, category: &str) -> Result<()> {
        // fail before copying if the run is unknown
        self.with_run(run_id, |_| ())?;
        let stored = self.storage.store_artifact(run_id, category, local_path)?;
        self.with_run(run_id, |run| run.artifacts.push(stored))
    }

    fn end_run(&self, run_id: &str, status: RunStatus) -> Result<()> {
        let mut run = self
            .active_runs
            .write()
            .remove(run_id)
            .ok_or_else(|| TrainerError::TrackingError(format!("no active run with id {}", run_id)))?;
        run.end_time = Some(Utc::now().timestamp_millis());
        run.status = status;

        let snapshot = {
            let mut experiment = self.experiment.write();
            experiment.runs.push(run);
            experiment.clone()
        };
        self.storage.save_experiment(&snapshot)?;

        debug!(run_id, status = status.as_str(), "Run ended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_lifecycle() {
        let dir = TempDir::new().unwrap();
        let tracker = LocalTracker::new(dir.path(), "trainer").unwrap();

        let run_id = tracker.start_run("model_trainer").unwrap();
        tracker.log_param(&run_id, "best_model", "Random Forest").unwrap();
        tracker.log_metric(&run_id, "test_f1_score", 0.91).unwrap();
        assert_eq!(tracker.active_run_count(), 1);

        tracker.end_run(&run_id, RunStatus::Finished).unwrap();
        assert_eq!(tracker.active_run_count(), 0);

        let runs = tracker.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Finished);
        assert_eq!(runs[0].metrics.get("test_f1_score"), Some(&0.91));
        assert_eq!(runs[0].params.get("best_model").map(String::as_str), Some("Random Forest"));
    }

    #[test]
    fn test_experiment_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        {
            let tracker = LocalTracker::new(dir.path(), "trainer").unwrap();
            let run_id = tracker.start_run("first").unwrap();
            tracker.end_run(&run_id, RunStatus::Failed).unwrap();
        }

        let reopened = LocalTracker::new(dir.path(), "trainer").unwrap();
        let runs = reopened.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].status, RunStatus::Failed);
    }

    #[test]
    fn test_log_artifact_copies_file() {
        let dir = TempDir::new().unwrap();
        let tracker = LocalTracker::new(dir.path().join("mlruns"), "trainer").unwrap();
        let artifact = dir.path().join("best_model.pkl");
        fs::write(&artifact, b"weights").unwrap();

        let run_id = tracker.start_run("artifacts").unwrap();
        tracker.log_artifact(&run_id, &artifact, "model").unwrap();
        tracker.end_run(&run_id, RunStatus::Finished).unwrap();

        let stored = &tracker.runs()[0].artifacts[0];
        assert!(stored.ends_with("model/best_model.pkl"));
        assert!(stored.exists());
    }

    #[test]
    fn test_unknown_run_is_tracking_error() {
        let dir = TempDir::new().unwrap();
        let tracker = LocalTracker::new(dir.path(), "trainer").unwrap();
        let err = tracker.log_metric("missing", "x", 1.0).unwrap_err();
        assert!(matches!(err, TrainerError::TrackingError(_)));
    }
}
