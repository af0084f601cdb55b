//! Estimator capability traits

use super::grid::ParamValue;
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2};

/// Anything that can be trained on a feature matrix and then predict labels.
pub trait Fittable: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Predict one label per row of `x`
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Hyperparameter assignment by name, used by grid search.
pub trait Tunable {
    /// Set a single hyperparameter. Unknown names and ill-typed values are errors.
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()>;
}

/// A candidate estimator: fittable, tunable and cheap enough to clone per
/// grid point and per fold.
pub trait Estimator: Fittable + Tunable + Clone {}

impl<T: Fittable + Tunable + Clone> Estimator for T {}

pub(crate) fn unknown_param(model: &str, name: &str, value: &ParamValue) -> TrainerError {
    TrainerError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: format!("{} has no such hyperparameter", model),
    }
}

pub(crate) fn check_xy(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(TrainerError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(TrainerError::TrainingError(
            "cannot fit on an empty training set".to_string(),
        ));
    }
    Ok(())
}

/// Sorted distinct labels
pub(crate) fn unique_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.to_vec();
    classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    classes.dedup();
    classes
}

pub(crate) fn class_index(classes: &[f64], label: f64) -> Option<usize> {
    classes.iter().position(|&c| (c - label).abs() < 1e-10)
}
