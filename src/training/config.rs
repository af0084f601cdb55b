//! Model trainer configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the trainer writes its outputs and how it tunes candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerConfig {
    /// Destination of the persisted inference pipeline
    pub trained_model_file_path: PathBuf,
    /// Root of the secondary bare-model copy
    pub final_model_dir: PathBuf,
    pub final_model_file_name: String,
    /// Scratch directory (next to the pipeline file) for the tracked model artifact
    pub artifact_dir_name: String,
    pub artifact_file_name: String,
    pub cv_folds: usize,
    pub random_state: Option<u64>,
}

impl Default for ModelTrainerConfig {
    fn default() -> Self {
        Self {
            trained_model_file_path: PathBuf::from("artifacts/model_trainer/trained_model/model.pkl"),
            final_model_dir: PathBuf::from("final_model"),
            final_model_file_name: "model.pkl".to_string(),
            artifact_dir_name: "mlflow_artifacts_temp".to_string(),
            artifact_file_name: "best_model.pkl".to_string(),
            cv_folds: 3,
            random_state: Some(42),
        }
    }
}

impl ModelTrainerConfig {
    pub fn new(trained_model_file_path: impl Into<PathBuf>) -> Self {
        Self {
            trained_model_file_path: trained_model_file_path.into(),
            ..Default::default()
        }
    }

    pub fn with_final_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.final_model_dir = dir.into();
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: Option<u64>) -> Self {
        self.random_state = seed;
        self
    }

    /// `<final_model_dir>/<final_model_file_name>`
    pub fn final_model_path(&self) -> PathBuf {
        self.final_model_dir.join(&self.final_model_file_name)
    }

    /// Scratch directory beside the pipeline file
    pub fn artifact_dir(&self) -> PathBuf {
        let parent = match self.trained_model_file_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        parent.join(&self.artifact_dir_name)
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.artifact_dir().join(&self.artifact_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_paths() {
        let config = ModelTrainerConfig::new("out/trained/model.pkl").with_final_model_dir("release");

        assert_eq!(config.final_model_path(), PathBuf::from("release/model.pkl"));
        assert_eq!(
            config.artifact_path(),
            PathBuf::from("out/trained/mlflow_artifacts_temp/best_model.pkl")
        );
    }

    #[test]
    fn test_bare_file_name_uses_current_dir() {
        let config = ModelTrainerConfig::new("model.pkl");
        assert_eq!(config.artifact_dir(), PathBuf::from("./mlflow_artifacts_temp"));
    }
}
