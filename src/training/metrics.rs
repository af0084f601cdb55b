//! Classification metrics and hold-out scorers

use crate::error::{Result, TrainerError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// F1 / precision / recall for one set of predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
}

/// Compute binary classification metrics, treating labels above 0.5 as the
/// positive class. Undefined ratios (no predicted or no actual positives)
/// score 0.
pub fn classification_score(
    y_true: &Array1<f64>,
    y_pred: &Array1<f64>,
) -> Result<ClassificationMetrics> {
    check_lengths(y_true, y_pred)?;

    let (tp, fp, fn_) = confusion_counts(y_true, y_pred);

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(ClassificationMetrics {
        f1_score: f1,
        precision_score: precision,
        recall_score: recall,
    })
}

fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    (tp, fp, fn_)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn check_lengths(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(TrainerError::ShapeError {
            expected: format!("{} predictions", y_true.len()),
            actual: format!("{} predictions", y_pred.len()),
        });
    }
    if y_true.is_empty() {
        return Err(TrainerError::TrainingError(
            "cannot score an empty prediction set".to_string(),
        ));
    }
    Ok(())
}

/// Scalar score of predictions against truth; higher is better.
pub trait Scorer: Send + Sync {
    fn name(&self) -> &'static str;

    fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64>;
}

/// Fraction of exactly matching labels
#[derive(Debug, Clone, Copy, Default)]
pub struct Accuracy;

impl Scorer for Accuracy {
    fn name(&self) -> &'static str {
        "accuracy"
    }

    fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        check_lengths(y_true, y_pred)?;
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 1e-10)
            .count();
        Ok(correct as f64 / y_true.len() as f64)
    }
}

/// Coefficient of determination. A constant target scores 1 when predicted
/// exactly and 0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct R2Score;

impl Scorer for R2Score {
    fn name(&self) -> &'static str {
        "r2"
    }

    fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        check_lengths(y_true, y_pred)?;

        let mean = y_true.mean().unwrap_or(0.0);
        let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum();

        if ss_tot > 0.0 {
            Ok(1.0 - ss_res / ss_tot)
        } else if ss_res == 0.0 {
            Ok(1.0)
        } else {
            Ok(0.0)
        }
    }
}
