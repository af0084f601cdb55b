//! Random forest classifier

use super::decision_tree::{Criterion, DecisionTree};
use super::grid::ParamValue;
use super::models::{check_xy, class_index, unique_classes, unknown_param, Fittable, Tunable};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for features considered per split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }
}

/// Bagged ensemble of decision trees with majority voting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            classes: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        if self.n_estimators == 0 {
            return Err(TrainerError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let n_samples = x.nrows();
        let n_features = x.ncols();
        let max_features = self.max_features.resolve(n_features);
        self.classes = unique_classes(y);

        let base_seed = match self.random_state {
            Some(seed) => seed,
            None => rand::thread_rng().gen(),
        };

        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let mut tree = DecisionTree::new_classifier()
                    .with_criterion(self.criterion)
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(seed);
                tree.max_depth = self.max_depth;

                if self.bootstrap {
                    let sample_indices: Vec<usize> =
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                    let x_boot = x.select(Axis(0), &sample_indices);
                    let y_boot = y.select(Axis(0), &sample_indices);
                    tree.fit(&x_boot, &y_boot)?;
                } else {
                    tree.fit(x, y)?;
                }
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(self)
    }

    /// Majority vote across trees; ties go to the smallest class label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(TrainerError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let n_classes = self.classes.len();
        Ok((0..x.nrows())
            .map(|i| {
                let mut votes = vec![0usize; n_classes];
                for preds in &all_predictions {
                    if let Some(c) = class_index(&self.classes, preds[i]) {
                        votes[c] += 1;
                    }
                }
                let mut best = 0;
                for (c, &v) in votes.iter().enumerate() {
                    if v > votes[best] {
                        best = c;
                    }
                }
                self.classes[best]
            })
            .collect())
    }
}

impl Fittable for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        RandomForest::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        RandomForest::predict(self, x)
    }
}

impl Tunable for RandomForest {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.n_estimators = value.as_usize(name)?,
            "max_depth" => self.max_depth = Some(value.as_usize(name)?),
            "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
            "max_features" => {
                self.max_features = match value {
                    ParamValue::Str(s) if s == "sqrt" => MaxFeatures::Sqrt,
                    ParamValue::Str(s) if s == "log2" => MaxFeatures::Log2,
                    ParamValue::Str(s) if s == "all" => MaxFeatures::All,
                    other => MaxFeatures::Fixed(other.as_usize(name)?),
                }
            }
            "criterion" => {
                let raw = value.as_str(name)?;
                self.criterion = Criterion::from_name(raw)
                    .filter(|c| *c != Criterion::MSE)
                    .ok_or_else(|| TrainerError::InvalidParameter {
                        name: name.to_string(),
                        value: raw.to_string(),
                        reason: "unknown classification criterion".to_string(),
                    })?;
            }
            _ => return Err(unknown_param("RandomForest", name, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 0.1], [0.2, 0.0], [0.1, 0.3], [0.3, 0.2], [0.2, 0.2],
            [1.0, 1.1], [1.2, 1.0], [1.1, 1.3], [1.3, 1.2], [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_forest_classifies_blobs() {
        let (x, y) = blobs();
        let mut rf = RandomForest::new_classifier(16).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        assert_eq!(rf.n_trees(), 16);
        let predictions = rf.predict(&array![[0.1, 0.1], [1.2, 1.1]]).unwrap();
        assert_eq!(predictions, array![0.0, 1.0]);
    }

    #[test]
    fn test_seeded_forest_is_reproducible() {
        let (x, y) = blobs();
        let mut a = RandomForest::new_classifier(8).with_random_state(7);
        let mut b = RandomForest::new_classifier(8).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let probe = array![[0.6, 0.6], [0.5, 0.7], [0.7, 0.4]];
        assert_eq!(a.predict(&probe).unwrap(), b.predict(&probe).unwrap());
    }

    #[test]
    fn test_set_n_estimators() {
        let mut rf = RandomForest::default();
        rf.set_param("n_estimators", &ParamValue::Int(32)).unwrap();
        assert_eq!(rf.n_estimators, 32);
        assert!(rf.set_param("learning_rate", &ParamValue::Float(0.1)).is_err());
    }
}
