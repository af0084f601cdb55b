//! Artifacts exchanged with the neighbouring pipeline stages

use super::metrics::ClassificationMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Output of the upstream transformation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    /// Transformed training array, label in the last column
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    /// Fitted preprocessor
    pub transformed_object_file_path: PathBuf,
}

/// Result of a successful trainer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub train_metric_artifact: ClassificationMetrics,
    pub test_metric_artifact: ClassificationMetrics,
}

impl fmt::Display for ModelTrainerArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ModelTrainerArtifact(trained_model_file_path={}, train f1={:.4} precision={:.4} recall={:.4}, test f1={:.4} precision={:.4} recall={:.4})",
            self.trained_model_file_path.display(),
            self.train_metric_artifact.f1_score,
            self.train_metric_artifact.precision_score,
            self.train_metric_artifact.recall_score,
            self.test_metric_artifact.f1_score,
            self.test_metric_artifact.precision_score,
            self.test_metric_artifact.recall_score,
        )
    }
}
