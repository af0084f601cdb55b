//! Hyperparameter grids and cross-validated grid search

use super::cross_validation::CrossValidator;
use super::metrics::Scorer;
use super::models::Estimator;
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single hyperparameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    pub fn as_f64(&self, name: &str) -> Result<f64> {
        match self {
            ParamValue::Float(v) => Ok(*v),
            ParamValue::Int(v) => Ok(*v as f64),
            ParamValue::Str(_) => Err(self.type_error(name, "a number")),
        }
    }

    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match self {
            ParamValue::Int(v) if *v >= 0 => Ok(*v as usize),
            _ => Err(self.type_error(name, "a non-negative integer")),
        }
    }

    pub fn as_str(&self, name: &str) -> Result<&str> {
        match self {
            ParamValue::Str(s) => Ok(s),
            _ => Err(self.type_error(name, "a string")),
        }
    }

    fn type_error(&self, name: &str, expected: &str) -> TrainerError {
        TrainerError::InvalidParameter {
            name: name.to_string(),
            value: self.to_string(),
            reason: format!("expected {}", expected),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

/// One concrete assignment of hyperparameters, in grid declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamSet(Vec<(String, ParamValue)>);

impl ParamSet {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Apply every assignment to `estimator`
    pub fn apply<E: Estimator>(&self, estimator: &mut E) -> Result<()> {
        for (name, value) in &self.0 {
            estimator.set_param(name, value)?;
        }
        Ok(())
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("{}");
        }
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Ordered mapping from parameter name to its candidate values.
///
/// Declaration order is kept so that enumeration (and therefore tie-breaking
/// between equally scored combinations) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    params: Vec<(String, Vec<ParamValue>)>,
}

impl ParamGrid {
    /// An empty grid: one default configuration
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter with its candidate values
    pub fn with<V: Into<ParamValue>>(mut self, name: &str, values: Vec<V>) -> Self {
        self.params
            .push((name.to_string(), values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn values(&self, name: &str) -> Option<&[ParamValue]> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of combinations the grid expands to
    pub fn n_combinations(&self) -> usize {
        self.params.iter().map(|(_, v)| v.len()).product()
    }

    /// Cartesian product of all values; the last declared parameter varies
    /// fastest. An empty grid yields a single empty set.
    pub fn combinations(&self) -> Result<Vec<ParamSet>> {
        for (name, values) in &self.params {
            if values.is_empty() {
                return Err(TrainerError::ConfigError(format!(
                    "grid entry '{}' has no candidate values",
                    name
                )));
            }
        }

        let mut sets: Vec<Vec<(String, ParamValue)>> = vec![Vec::new()];
        for (name, values) in &self.params {
            let mut next = Vec::with_capacity(sets.len() * values.len());
            for prefix in &sets {
                for value in values {
                    let mut set = prefix.clone();
                    set.push((name.clone(), value.clone()));
                    next.push(set);
                }
            }
            sets = next;
        }

        Ok(sets.into_iter().map(ParamSet).collect())
    }
}

/// Cross-validated score of one grid point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvResult {
    pub params: ParamSet,
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

/// Outcome of a full grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub results: Vec<CvResult>,
}

/// Exhaustive search over a [`ParamGrid`], scoring each combination by its
/// mean score across cross-validation folds of the training data.
pub struct GridSearch<'a> {
    cv: &'a CrossValidator,
    scorer: &'a dyn Scorer,
}

impl<'a> GridSearch<'a> {
    pub fn new(cv: &'a CrossValidator, scorer: &'a dyn Scorer) -> Self {
        Self { cv, scorer }
    }

    /// Evaluate every combination and return the best one. Ties go to the
    /// combination enumerated first.
    pub fn search<E: Estimator>(
        &self,
        estimator: &E,
        grid: &ParamGrid,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<GridSearchResult> {
        let combinations = grid.combinations()?;
        let splits = self.cv.split(x.nrows(), Some(y))?;

        let folds: Vec<_> = splits
            .iter()
            .map(|split| {
                (
                    x.select(Axis(0), &split.train_indices),
                    y.select(Axis(0), &split.train_indices),
                    x.select(Axis(0), &split.test_indices),
                    y.select(Axis(0), &split.test_indices),
                )
            })
            .collect();

        // collect keeps grid order, so selection below stays deterministic
        let results: Vec<CvResult> = combinations
            .into_par_iter()
            .map(|params| {
                let mut configured = estimator.clone();
                params.apply(&mut configured)?;

                let fold_scores = folds
                    .iter()
                    .map(|(x_tr, y_tr, x_te, y_te)| {
                        let mut model = configured.clone();
                        model.fit(x_tr, y_tr)?;
                        let y_pred = model.predict(x_te)?;
                        self.scorer.score(y_te, &y_pred)
                    })
                    .collect::<Result<Vec<f64>>>()?;

                let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
                Ok(CvResult {
                    params,
                    mean_score,
                    fold_scores,
                })
            })
            .collect::<Result<Vec<CvResult>>>()?;

        let best_idx = first_max(results.iter().map(|r| r.mean_score)).ok_or_else(|| {
            TrainerError::TrainingError("grid search produced no results".to_string())
        })?;

        Ok(GridSearchResult {
            best_params: results[best_idx].params.clone(),
            best_score: results[best_idx].mean_score,
            results,
        })
    }
}

/// Index of the first maximum; NaN never wins over a number.
pub(crate) fn first_max(scores: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.enumerate() {
        match best {
            None => best = Some((i, score)),
            Some((_, b)) if score > b || (b.is_nan() && !score.is_nan()) => {
                best = Some((i, score))
            }
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::cross_validation::CVStrategy;
    use crate::training::metrics::Accuracy;
    use crate::training::DecisionTree;
    use ndarray::array;

    #[test]
    fn test_combinations_order() {
        let grid = ParamGrid::new()
            .with("learning_rate", vec![0.1, 0.01])
            .with("n_estimators", vec![8i64, 16, 32]);

        let combos = grid.combinations().unwrap();
        assert_eq!(combos.len(), 6);
        assert_eq!(grid.n_combinations(), 6);
        assert_eq!(combos[0].to_string(), "{learning_rate=0.1, n_estimators=8}");
        assert_eq!(combos[1].to_string(), "{learning_rate=0.1, n_estimators=16}");
        assert_eq!(combos[5].to_string(), "{learning_rate=0.01, n_estimators=32}");
    }

    #[test]
    fn test_empty_grid_has_one_combination() {
        let combos = ParamGrid::new().combinations().unwrap();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn test_empty_value_list_is_config_error() {
        let grid = ParamGrid::new().with::<i64>("n_estimators", vec![]);
        assert!(matches!(
            grid.combinations().unwrap_err(),
            TrainerError::ConfigError(_)
        ));
    }

    #[test]
    fn test_param_value_accessors() {
        assert_eq!(ParamValue::Int(8).as_usize("n").unwrap(), 8);
        assert_eq!(ParamValue::Int(8).as_f64("n").unwrap(), 8.0);
        assert_eq!(ParamValue::from("gini").as_str("criterion").unwrap(), "gini");
        assert!(ParamValue::Float(0.5).as_usize("n").is_err());
        assert!(ParamValue::Int(-1).as_usize("n").is_err());
    }

    #[test]
    fn test_first_max_prefers_earliest() {
        assert_eq!(first_max([0.5, 0.9, 0.9, 0.1].into_iter()), Some(1));
        assert_eq!(first_max([f64::NAN, 0.2].into_iter()), Some(1));
        assert_eq!(first_max(std::iter::empty()), None);
    }

    #[test]
    fn test_grid_search_picks_depth() {
        let x = array![
            [0.0, 0.0], [0.1, 1.0], [0.2, 0.0], [0.3, 1.0],
            [1.0, 0.0], [1.1, 1.0], [1.2, 0.0], [1.3, 1.0],
            [0.05, 0.5], [1.05, 0.5], [0.15, 0.2], [1.15, 0.8],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 0.0, 1.0];

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false });
        let scorer = Accuracy;
        let search = GridSearch::new(&cv, &scorer);
        let grid = ParamGrid::new().with("criterion", vec!["gini", "entropy"]);

        let result = search
            .search(&DecisionTree::new_classifier(), &grid, &x, &y)
            .unwrap();

        assert_eq!(result.results.len(), 2);
        assert!(result.best_score > 0.9);
        assert_eq!(result.results[0].fold_scores.len(), 3);
        // equal scores: first declared value wins
        assert_eq!(result.best_params.get("criterion"), Some(&ParamValue::from("gini")));
    }
}
