//! AdaBoost (SAMME) over decision stumps
//!
//! Each round fits a one-split stump to the current sample weights, then
//! upweights the samples it misclassifies.

use super::grid::ParamValue;
use super::models::{check_xy, class_index, unique_classes, unknown_param, Fittable, Tunable};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Class index when feature <= threshold
    left_class: usize,
    /// Class index when feature > threshold
    right_class: usize,
}

impl Stump {
    fn predict_sample(&self, sample: ArrayView1<f64>) -> usize {
        if sample[self.feature_index] <= self.threshold {
            self.left_class
        } else {
            self.right_class
        }
    }
}

/// AdaBoost classifier (SAMME, supports multi-class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
    is_fitted: bool,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Number of stumps actually kept (boosting may stop early)
    pub fn n_stumps(&self) -> usize {
        self.stumps.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        if !(self.learning_rate > 0.0) {
            return Err(TrainerError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }

        self.classes = unique_classes(y);
        let n_classes = self.classes.len();
        let n_samples = x.nrows();
        let targets: Vec<usize> = y
            .iter()
            .map(|&v| class_index(&self.classes, v).unwrap_or(0))
            .collect();

        // each feature's sample order is fixed across rounds
        let orders: Vec<Vec<usize>> = (0..x.ncols())
            .map(|f| {
                let mut order: Vec<usize> = (0..n_samples).collect();
                order.sort_by(|&a, &b| {
                    x[[a, f]]
                        .partial_cmp(&x[[b, f]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                order
            })
            .collect();

        let mut weights = vec![1.0 / n_samples as f64; n_samples];
        self.stumps.clear();
        self.alphas.clear();

        for _ in 0..self.n_estimators {
            let stump = fit_stump(x, &targets, &weights, n_classes, &orders);

            let missed: Vec<bool> = (0..n_samples)
                .map(|i| stump.predict_sample(x.row(i)) != targets[i])
                .collect();
            let error: f64 = weights
                .iter()
                .zip(missed.iter())
                .filter(|(_, &m)| m)
                .map(|(w, _)| w)
                .sum();

            if error <= 1e-12 {
                // perfect stump: it alone decides
                self.stumps.push(stump);
                self.alphas.push(1.0);
                break;
            }
            if error >= 1.0 - 1.0 / n_classes as f64 {
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(1.0);
                }
                break;
            }

            let alpha = self.learning_rate
                * (((1.0 - error) / error).ln() + (n_classes as f64 - 1.0).ln());

            for (w, &m) in weights.iter_mut().zip(missed.iter()) {
                if m {
                    *w *= alpha.exp();
                }
            }
            let w_sum: f64 = weights.iter().sum();
            for w in &mut weights {
                *w /= w_sum;
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        self.is_fitted = true;
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(TrainerError::ModelNotFitted);
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| {
                let mut scores = vec![0.0f64; self.classes.len()];
                for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
                    scores[stump.predict_sample(row)] += alpha;
                }
                let mut best = 0;
                for (c, &s) in scores.iter().enumerate() {
                    if s > scores[best] {
                        best = c;
                    }
                }
                self.classes[best]
            })
            .collect())
    }
}

/// Best weighted stump by a sorted sweep over every feature. Falls back to a
/// constant majority stump when no feature can be split.
fn fit_stump(
    x: &Array2<f64>,
    targets: &[usize],
    weights: &[f64],
    n_classes: usize,
    orders: &[Vec<usize>],
) -> Stump {
    let mut total = vec![0.0f64; n_classes];
    for (&t, &w) in targets.iter().zip(weights.iter()) {
        total[t] += w;
    }
    let total_mass: f64 = total.iter().sum();
    let majority = argmax(&total);

    let mut best = Stump {
        feature_index: 0,
        threshold: f64::INFINITY,
        left_class: majority,
        right_class: majority,
    };
    let mut best_error = total_mass - total[majority];

    for (f, order) in orders.iter().enumerate() {
        let mut left = vec![0.0f64; n_classes];
        for pos in 0..order.len().saturating_sub(1) {
            let i = order[pos];
            left[targets[i]] += weights[i];

            let here = x[[i, f]];
            let next = x[[order[pos + 1], f]];
            if next <= here {
                continue;
            }

            let right: Vec<f64> = total.iter().zip(left.iter()).map(|(t, l)| t - l).collect();
            let left_class = argmax(&left);
            let right_class = argmax(&right);
            let error = total_mass - left[left_class] - right[right_class];

            if error < best_error - 1e-12 {
                best_error = error;
                best = Stump {
                    feature_index: f,
                    threshold: (here + next) / 2.0,
                    left_class,
                    right_class,
                };
            }
        }
    }
    best
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

impl Fittable for AdaBoostClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        AdaBoostClassifier::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        AdaBoostClassifier::predict(self, x)
    }
}

impl Tunable for AdaBoostClassifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "n_estimators" => self.n_estimators = value.as_usize(name)?,
            "learning_rate" => self.learning_rate = value.as_f64(name)?,
            _ => return Err(unknown_param("AdaBoostClassifier", name, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_adaboost_binary() {
        let x = array![
            [1.0, 2.0], [2.0, 3.0], [3.0, 4.0],
            [6.0, 7.0], [7.0, 8.0], [8.0, 9.0],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = AdaBoostClassifier::new(10, 1.0);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        // separable by one stump
        assert_eq!(model.n_stumps(), 1);
    }

    #[test]
    fn test_adaboost_interval() {
        // positives sit in the middle: needs more than one stump
        let x = array![[0.0], [1.0], [2.0], [3.0], [4.0], [5.0], [6.0], [7.0], [8.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let mut model = AdaBoostClassifier::new(3, 1.0);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.n_stumps(), 3);
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_adaboost_single_class() {
        let x = array![[0.0], [1.0]];
        let y = array![3.0, 3.0];
        let mut model = AdaBoostClassifier::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&array![[9.0]]).unwrap(), array![3.0]);
    }
}
