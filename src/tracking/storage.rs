//! Filesystem persistence for tracked experiments

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::tracker::Experiment;
use crate::error::{Result, TrainerError};

/// JSON-file backed experiment store rooted at one directory
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_dir: PathBuf,
}

impl LocalStorage {
    /// Create the store, making sure the directory exists
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).map_err(|e| {
            TrainerError::TrackingError(format!(
                "failed to create tracking directory {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn experiments_file(&self) -> PathBuf {
        self.base_dir.join("experiments.json")
    }

    /// Directory holding a run's artifacts of one category
    pub fn artifact_dir(&self, run_id: &str, category: &str) -> PathBuf {
        self.base_dir.join(run_id).join("artifacts").join(category)
    }

    pub fn load_experiments(&self) -> Result<Vec<Experiment>> {
        let path = self.experiments_file();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn load_experiment(&self, name: &str) -> Result<Option<Experiment>> {
        Ok(self
            .load_experiments()?
            .into_iter()
            .find(|e| e.name == name))
    }

    /// Insert or replace (by experiment id) and rewrite the store
    pub fn save_experiment(&self, experiment: &Experiment) -> Result<()> {
        let mut experiments = self.load_experiments()?;
        match experiments
            .iter_mut()
            .find(|e| e.experiment_id == experiment.experiment_id)
        {
            Some(existing) => *existing = experiment.clone(),
            None => experiments.push(experiment.clone()),
        }

        let mut writer = BufWriter::new(File::create(self.experiments_file())?);
        serde_json::to_writer_pretty(&mut writer, &experiments)?;
        writer.flush()?;
        Ok(())
    }

    /// Copy `source` into the run's artifact directory, returning the stored path
    pub fn store_artifact(&self, run_id: &str, category: &str, source: &Path) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| {
            TrainerError::TrackingError(format!("artifact path {} has no file name", source.display()))
        })?;

        let dir = self.artifact_dir(run_id, category);
        fs::create_dir_all(&dir)?;
        let destination = dir.join(file_name);
        fs::copy(source, &destination).map_err(|e| {
            TrainerError::TrackingError(format!(
                "failed to copy artifact {}: {}",
                source.display(),
                e
            ))
        })?;
        Ok(destination)
    }
}
