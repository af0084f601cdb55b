//! Gradient boosted decision trees for binary classification
//!
//! Each round fits a shallow regression tree to the log-loss gradient
//! (label minus current probability) on a row subsample.

use super::decision_tree::DecisionTree;
use super::grid::ParamValue;
use super::models::{check_xy, unique_classes, unknown_param, Fittable, Tunable};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Fraction of rows each tree is fitted on
    pub subsample: f64,
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

/// Gradient boosting classifier (binary)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    pub config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
    /// Negative and positive class labels
    classes: Vec<f64>,
    is_fitted: bool,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_xy(x, y)?;
        self.validate()?;

        let classes = unique_classes(y);
        if classes.len() > 2 {
            return Err(TrainerError::TrainingError(format!(
                "gradient boosting supports binary targets only, found {} classes",
                classes.len()
            )));
        }
        self.classes = classes;
        self.trees.clear();

        // single-class input: constant prediction, no trees
        if self.classes.len() == 1 {
            self.initial_log_odds = 0.0;
            self.is_fitted = true;
            return Ok(());
        }

        let positive = self.classes[1];
        let target: Array1<f64> = y
            .iter()
            .map(|&v| if (v - positive).abs() < 1e-10 { 1.0 } else { 0.0 })
            .collect();

        let n_samples = x.nrows();
        let p = target.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();
        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = target
                .iter()
                .zip(log_odds.iter())
                .map(|(t, &lo)| t - sigmoid(lo))
                .collect();

            let rows = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &rows);
            let r_sub = residuals.select(Axis(0), &rows);

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            let update = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &update);
            self.trees.push(tree);
        }

        self.is_fitted = true;
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.classes.len() == 1 {
            return Ok(Array1::from_elem(x.nrows(), self.classes[0]));
        }
        let probs = self.predict_proba(x)?;
        Ok(probs
            .iter()
            .map(|&p| if p >= 0.5 { self.classes[1] } else { self.classes[0] })
            .collect())
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(TrainerError::ModelNotFitted);
        }
        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let update = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &update);
        }
        Ok(log_odds.mapv(sigmoid))
    }

    fn validate(&self) -> Result<()> {
        let c = &self.config;
        if !(c.subsample > 0.0 && c.subsample <= 1.0) {
            return Err(TrainerError::InvalidParameter {
                name: "subsample".to_string(),
                value: c.subsample.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if !(c.learning_rate > 0.0) {
            return Err(TrainerError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: c.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl Fittable for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        GradientBoostingClassifier::fit(self, x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        GradientBoostingClassifier::predict(self, x)
    }
}

impl Tunable for GradientBoostingClassifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.config.n_estimators = value.as_usize(name)?,
            "learning_rate" => self.config.learning_rate = value.as_f64(name)?,
            "subsample" => self.config.subsample = value.as_f64(name)?,
            "max_depth" => self.config.max_depth = value.as_usize(name)?,
            "min_samples_leaf" => self.config.min_samples_leaf = value.as_usize(name)?,
            _ => return Err(unknown_param("GradientBoostingClassifier", name, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| {
            let base = if i < 20 { 0.0 } else { 3.0 };
            base + ((i * 7 + j * 3) % 10) as f64 * 0.1
        });
        let y = Array1::from_shape_fn(40, |i| if i < 20 { 0.0 } else { 1.0 });
        (x, y)
    }

    #[test]
    fn test_gradient_boosting_classifier() {
        let (x, y) = create_classification_data();
        let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 20,
            subsample: 0.8,
            ..Default::default()
        });
        model.fit(&x, &y).unwrap();

        assert_eq!(model.n_trees(), 20);
        assert_eq!(model.predict(&x).unwrap(), y);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_keeps_original_labels() {
        let x = array![[0.0], [0.1], [0.2], [1.0], [1.1], [1.2]];
        let y = array![2.0, 2.0, 2.0, 5.0, 5.0, 5.0];

        let mut model = GradientBoostingClassifier::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_rejects_multiclass() {
        let x = array![[0.0], [1.0], [2.0]];
        let y = array![0.0, 1.0, 2.0];
        let mut model = GradientBoostingClassifier::default();
        assert!(model.fit(&x, &y).is_err());
    }

    #[test]
    fn test_single_class() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 1.0];
        let mut model = GradientBoostingClassifier::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&array![[5.0]]).unwrap(), array![1.0]);
    }

    #[test]
    fn test_set_params() {
        let mut model = GradientBoostingClassifier::default();
        model.set_param("learning_rate", &ParamValue::Float(0.05)).unwrap();
        model.set_param("subsample", &ParamValue::Float(0.75)).unwrap();
        model.set_param("n_estimators", &ParamValue::Int(8)).unwrap();
        assert_eq!(model.config.learning_rate, 0.05);
        assert_eq!(model.config.subsample, 0.75);
        assert_eq!(model.config.n_estimators, 8);
    }
}
