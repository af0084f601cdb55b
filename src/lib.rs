//! netsec-trainer - model trainer stage of a network security pipeline
//!
//! Takes the transformed train/test arrays produced upstream, grid-searches a
//! fixed roster of classifiers, keeps the one with the best held-out score,
//! records the run in an experiment tracker and persists the winner bundled
//! with its preprocessor.
//!
//! # Modules
//!
//! - [`training`] - Estimators, grid search, model selection and the trainer stage
//! - [`preprocessing`] - Fitted feature transformations (KNN imputation)
//! - [`inference`] - Preprocessor + model inference pipeline
//! - [`export`] - Binary persistence of arrays, models and pipelines
//! - [`tracking`] - Experiment tracking (local filesystem or MLflow)
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use netsec_trainer::prelude::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let data = DataTransformationArtifact {
//!     transformed_train_file_path: "artifacts/data_transformation/train.npy".into(),
//!     transformed_test_file_path: "artifacts/data_transformation/test.npy".into(),
//!     transformed_object_file_path: "artifacts/data_transformation/preprocessing.pkl".into(),
//! };
//! let tracker = LocalTracker::new("mlruns", "network-security")?;
//! let trainer: ModelTrainer = ModelTrainer::new(ModelTrainerConfig::default(), data, tracker);
//! let artifact = trainer.run()?;
//! println!("{}", artifact);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod export;
pub mod inference;
pub mod logging;
pub mod preprocessing;
pub mod tracking;
pub mod training;

pub use error::{ErrorKind, Result, StageError, TrainerError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{ErrorKind, Result, StageError, TrainerError};

    pub use crate::training::{
        classification_score, default_roster, CandidateModel, Classifier, ClassificationMetrics,
        DataTransformationArtifact, Estimator, Fittable, ModelReport, ModelSelector,
        ModelTrainer, ModelTrainerArtifact, ModelTrainerConfig, ParamGrid, Tunable,
    };

    pub use crate::preprocessing::{KnnImputer, Transform};

    pub use crate::inference::{InferencePipeline, NetworkModel};

    pub use crate::export::{load_array, load_object, save_array, save_object, ModelMetadata};

    pub use crate::tracking::{
        ExperimentSink, LocalTracker, MlflowTracker, RunStatus, TrackingConfig,
    };
}
