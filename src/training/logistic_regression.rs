//! Logistic regression fitted by batch gradient descent
//!
//! Binary targets train one model; more than two classes train one-vs-rest.

use super::grid::ParamValue;
use super::models::{check_xy, unique_classes, unknown_param, Fittable, Tunable};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// L2-regularized logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// One row of weights per fitted binary model
    pub coefficients: Option<Array2<f64>>,
    pub intercepts: Option<Array1<f64>>,
    /// L2 regularization strength
    pub alpha: f64,
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this
    pub tol: f64,
    pub learning_rate: f64,
    classes: Vec<f64>,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercepts: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            classes: Vec::new(),
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.classes.is_empty()
    }

    fn sigmoid(z: &Array1<f64>) -> Array1<f64> {
        z.mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        let classes = unique_classes(y);

        let positives: Vec<f64> = match classes.len() {
            1 => Vec::new(),
            2 => vec![classes[1]],
            _ => classes.clone(),
        };

        let mut coefficients = Array2::zeros((positives.len(), x.ncols()));
        let mut intercepts = Array1::zeros(positives.len());
        for (k, &positive) in positives.iter().enumerate() {
            let target = y.mapv(|v| if (v - positive).abs() < 1e-10 { 1.0 } else { 0.0 });
            let (w, b) = self.gradient_descent(x, &target);
            coefficients.row_mut(k).assign(&w);
            intercepts[k] = b;
        }

        self.classes = classes;
        self.coefficients = Some(coefficients);
        self.intercepts = Some(intercepts);
        Ok(self)
    }

    fn gradient_descent(&self, x: &Array2<f64>, y: &Array1<f64>) -> (Array1<f64>, f64) {
        let n_samples = x.nrows() as f64;
        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;

        for _ in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = Self::sigmoid(&linear);

            let errors = &predictions - y;
            let dw = (x.t().dot(&errors) / n_samples) + (self.alpha * &weights);
            let db = errors.mean().unwrap_or(0.0);

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                break;
            }

            weights = weights - self.learning_rate * dw;
            bias -= self.learning_rate * db;
        }

        (weights, bias)
    }

    /// Per-model positive-class probabilities, one column per binary model
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(coefficients), Some(intercepts)) = (&self.coefficients, &self.intercepts) else {
            return Err(TrainerError::ModelNotFitted);
        };
        if coefficients.nrows() > 0 && x.ncols() != coefficients.ncols() {
            return Err(TrainerError::ShapeError {
                expected: format!("{} features", coefficients.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut linear = x.dot(&coefficients.t());
        linear += &intercepts.view().insert_axis(Axis(0));
        Ok(linear.mapv(|v| 1.0 / (1.0 + (-v).exp())))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let classes = &self.classes;

        Ok(match classes.len() {
            1 => Array1::from_elem(x.nrows(), classes[0]),
            2 => proba
                .column(0)
                .mapv(|p| if p >= 0.5 { classes[1] } else { classes[0] }),
            _ => proba
                .rows()
                .into_iter()
                .map(|row| {
                    let mut best = 0;
                    for (k, &p) in row.iter().enumerate() {
                        if p > row[best] {
                            best = k;
                        }
                    }
                    classes[best]
                })
                .collect(),
        })
    }
}

impl Fittable for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        LogisticRegression::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        LogisticRegression::predict(self, x)
    }
}

impl Tunable for LogisticRegression {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "alpha" => self.alpha = value.as_f64(name)?,
            "max_iter" => self.max_iter = value.as_usize(name)?,
            "tol" => self.tol = value.as_f64(name)?,
            "learning_rate" => self.learning_rate = value.as_f64(name)?,
            _ => return Err(unknown_param("LogisticRegression", name, value)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_binary() {
        let x = array![[-2.0, 0.0], [-1.5, 0.5], [-1.0, 0.0], [1.0, 0.0], [1.5, 0.5], [2.0, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::new();
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&x).unwrap();
        assert_eq!(proba.ncols(), 1);
        assert!(proba[[0, 0]] < 0.5 && proba[[5, 0]] > 0.5);
    }

    #[test]
    fn test_one_vs_rest() {
        let x = array![[-3.0], [-2.5], [0.0], [0.2], [3.0], [2.5]];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut model = LogisticRegression::new().with_max_iter(3000);
        model.fit(&x, &y).unwrap();

        let predictions = model.predict(&array![[-3.0], [3.0]]).unwrap();
        assert_eq!(predictions, array![0.0, 2.0]);
    }

    #[test]
    fn test_single_class() {
        let mut model = LogisticRegression::new();
        model.fit(&array![[0.0], [1.0]], &array![4.0, 4.0]).unwrap();
        assert_eq!(model.predict(&array![[7.0]]).unwrap(), array![4.0]);
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::new();
        assert!(matches!(
            model.predict(&array![[0.0]]).unwrap_err(),
            TrainerError::ModelNotFitted
        ));
    }
}
