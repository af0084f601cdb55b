//! Model trainer stage: selection, evaluation, tracking and persistence

use std::marker::PhantomData;

use ndarray::{s, Array1, Array2};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use super::artifact::{DataTransformationArtifact, ModelTrainerArtifact};
use super::classifier::Classifier;
use super::config::ModelTrainerConfig;
use super::metrics::{classification_score, ClassificationMetrics};
use super::models::Fittable;
use super::roster::{default_roster, CandidateModel};
use super::selector::{ModelSelector, Selection};
use crate::error::{Result, StageError, TrainerError};
use crate::export::{load_array, load_object, save_object_with_metadata, ModelMetadata};
use crate::inference::InferencePipeline;
use crate::preprocessing::{KnnImputer, Transform};
use crate::tracking::{ExperimentSink, RunStatus};

const RUN_NAME: &str = "model_trainer";

/// Split a stage array into features (all but the last column) and label
/// (last column).
pub fn split_features_label(data: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    let n_cols = data.ncols();
    if n_cols < 2 {
        return Err(TrainerError::DataError(format!(
            "expected at least one feature column and a label column, got {} column(s)",
            n_cols
        )));
    }
    if data.nrows() == 0 {
        return Err(TrainerError::DataError("array has no rows".to_string()));
    }
    let x = data.slice(s![.., ..n_cols - 1]).to_owned();
    let y = data.column(n_cols - 1).to_owned();
    Ok((x, y))
}

/// Metric names and values as they are logged to the tracker
pub fn metric_entries(prefix: &str, metrics: &ClassificationMetrics) -> [(String, f64); 3] {
    [
        (format!("{}_f1_score", prefix), metrics.f1_score),
        (format!("{}_precision", prefix), metrics.precision_score),
        (format!("{}_recall_score", prefix), metrics.recall_score),
    ]
}

/// Trains the candidate roster on the transformed arrays, records the winner
/// in the experiment tracker, and persists it wrapped with the upstream
/// preprocessor `P`.
pub struct ModelTrainer<P = KnnImputer> {
    config: ModelTrainerConfig,
    data_artifact: DataTransformationArtifact,
    tracker: Box<dyn ExperimentSink>,
    artifact_category: String,
    roster: Vec<CandidateModel<Classifier>>,
    selector: ModelSelector,
    _preprocessor: PhantomData<fn() -> P>,
}

impl<P> ModelTrainer<P>
where
    P: Transform + Serialize + DeserializeOwned,
{
    pub fn new(
        config: ModelTrainerConfig,
        data_artifact: DataTransformationArtifact,
        tracker: impl ExperimentSink + 'static,
    ) -> Self {
        let roster = default_roster(config.random_state);
        let selector = ModelSelector::new(config.cv_folds, config.random_state);
        Self {
            config,
            data_artifact,
            tracker: Box::new(tracker),
            artifact_category: "model".to_string(),
            roster,
            selector,
            _preprocessor: PhantomData,
        }
    }

    /// Replace the default five-candidate roster
    pub fn with_roster(mut self, roster: Vec<CandidateModel<Classifier>>) -> Self {
        self.roster = roster;
        self
    }

    pub fn with_selector(mut self, selector: ModelSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Category the winning model is logged under in the tracker
    pub fn with_artifact_category(mut self, category: impl Into<String>) -> Self {
        self.artifact_category = category.into();
        self
    }

    pub fn config(&self) -> &ModelTrainerConfig {
        &self.config
    }

    /// Run the stage end to end
    pub fn run(&self) -> std::result::Result<ModelTrainerArtifact, StageError> {
        info!("Entered model trainer stage");

        let train = load_array(&self.data_artifact.transformed_train_file_path)?;
        let test = load_array(&self.data_artifact.transformed_test_file_path)?;
        let (x_train, y_train) = split_features_label(&train)?;
        let (x_test, y_test) = split_features_label(&test)?;

        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x_train.ncols(),
            "Loaded transformed arrays"
        );

        let artifact = self.train_model(&x_train, &y_train, &x_test, &y_test)?;
        info!("Model trainer artifact: {}", artifact);
        Ok(artifact)
    }

    fn train_model(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> std::result::Result<ModelTrainerArtifact, StageError> {
        let selection = self
            .selector
            .select(x_train, y_train, x_test, y_test, self.roster.clone())?;

        let train_metrics = classification_score(y_train, &selection.best_model.predict(x_train)?)?;
        let test_metrics = classification_score(y_test, &selection.best_model.predict(x_test)?)?;

        // missing preprocessor must fail before any tracking side effect
        let preprocessor: P = load_object(&self.data_artifact.transformed_object_file_path)?;

        self.track(&selection, &train_metrics, &test_metrics)?;

        let metadata = self.metadata(&selection, &train_metrics, &test_metrics);
        let pipeline = InferencePipeline::new(preprocessor, selection.best_model.clone());

        save_object_with_metadata(
            &self.config.trained_model_file_path,
            &pipeline,
            metadata.clone().with_object_type("pipeline"),
        )?;
        let final_path = self.config.final_model_path();
        save_object_with_metadata(
            &final_path,
            &selection.best_model,
            metadata.with_object_type("model"),
        )?;

        info!(
            pipeline = %self.config.trained_model_file_path.display(),
            model = %final_path.display(),
            "Persisted trained model"
        );

        Ok(ModelTrainerArtifact {
            trained_model_file_path: self.config.trained_model_file_path.clone(),
            train_metric_artifact: train_metrics,
            test_metric_artifact: test_metrics,
        })
    }

    /// One tracking run holding the six metrics and the winning model. A run
    /// that fails part-way is closed as failed.
    fn track(
        &self,
        selection: &Selection<Classifier>,
        train_metrics: &ClassificationMetrics,
        test_metrics: &ClassificationMetrics,
    ) -> Result<()> {
        let run_id = self.tracker.start_run(RUN_NAME)?;

        match self.log_run(&run_id, selection, train_metrics, test_metrics) {
            Ok(()) => self.tracker.end_run(&run_id, RunStatus::Finished),
            Err(e) => {
                if let Err(end_err) = self.tracker.end_run(&run_id, RunStatus::Failed) {
                    warn!(run_id = %run_id, error = %end_err, "Failed to close tracking run");
                }
                Err(e)
            }
        }
    }

    fn log_run(
        &self,
        run_id: &str,
        selection: &Selection<Classifier>,
        train_metrics: &ClassificationMetrics,
        test_metrics: &ClassificationMetrics,
    ) -> Result<()> {
        self.tracker
            .log_param(run_id, "best_model", &selection.best_model_name)?;
        for (name, value) in selection.best_params.iter() {
            self.tracker
                .log_param(run_id, &format!("best_{}", name), &value.to_string())?;
        }

        for (name, value) in metric_entries("train", train_metrics)
            .into_iter()
            .chain(metric_entries("test", test_metrics))
        {
            self.tracker.log_metric(run_id, &name, value)?;
        }

        let artifact_path = self.config.artifact_path();
        save_object_with_metadata(
            &artifact_path,
            &selection.best_model,
            ModelMetadata::new(selection.best_model_name.clone()).with_object_type("model"),
        )?;
        self.tracker
            .log_artifact(run_id, &artifact_path, &self.artifact_category)?;

        info!(run_id, model = %selection.best_model_name, "Tracked training run");
        Ok(())
    }

    fn metadata(
        &self,
        selection: &Selection<Classifier>,
        train_metrics: &ClassificationMetrics,
        test_metrics: &ClassificationMetrics,
    ) -> ModelMetadata {
        let mut metadata = ModelMetadata::new(selection.best_model_name.clone())
            .add_hyperparameter("algorithm", selection.best_model.algorithm())
            .add_metric(
                format!("holdout_{}", self.selector.holdout_scorer_name()),
                selection.best_score,
            );
        for (name, value) in selection.best_params.iter() {
            metadata = metadata.add_hyperparameter(name, value.to_string());
        }
        for (name, value) in metric_entries("train", train_metrics)
            .into_iter()
            .chain(metric_entries("test", test_metrics))
        {
            metadata = metadata.add_metric(name, value);
        }
        metadata
    }
}
