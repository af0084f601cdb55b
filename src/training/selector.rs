//! Model selection: tune every candidate, then pick the best on held-out data

use super::cross_validation::{CVStrategy, CrossValidator};
use super::grid::{first_max, GridSearch, GridSearchResult, ParamSet};
use super::metrics::{Accuracy, R2Score, Scorer};
use super::models::Estimator;
use super::roster::CandidateModel;
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Held-out score per candidate, in roster order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    entries: Vec<(String, f64)>,
}

impl ModelReport {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| *s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), *s))
    }

    fn insert(&mut self, name: String, score: f64) {
        self.entries.push((name, score));
    }
}

/// Outcome of a selection: the report plus the refitted winner
#[derive(Debug, Clone)]
pub struct Selection<E> {
    pub report: ModelReport,
    pub best_model_name: String,
    pub best_model: E,
    pub best_score: f64,
    pub best_params: ParamSet,
    /// Grid search outcome per candidate, in roster order
    pub searches: Vec<GridSearchResult>,
}

/// Grid-searches each candidate with cross-validation on the training split,
/// refits it with its best parameters, scores it on the held-out split, and
/// returns the candidate with the highest held-out score.
pub struct ModelSelector {
    cv: CrossValidator,
    cv_scorer: Box<dyn Scorer>,
    holdout_scorer: Box<dyn Scorer>,
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new(3, None)
    }
}

impl ModelSelector {
    /// Stratified, unshuffled `cv_folds`-fold CV scored by accuracy; hold-out
    /// scored by R².
    pub fn new(cv_folds: usize, random_state: Option<u64>) -> Self {
        let mut cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: cv_folds,
            shuffle: false,
        });
        if let Some(seed) = random_state {
            cv = cv.with_random_state(seed);
        }
        Self {
            cv,
            cv_scorer: Box::new(Accuracy),
            holdout_scorer: Box::new(R2Score),
        }
    }

    pub fn with_cv_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.cv_scorer = Box::new(scorer);
        self
    }

    pub fn with_holdout_scorer(mut self, scorer: impl Scorer + 'static) -> Self {
        self.holdout_scorer = Box::new(scorer);
        self
    }

    pub fn holdout_scorer_name(&self) -> &'static str {
        self.holdout_scorer.name()
    }

    pub fn select<E: Estimator>(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
        roster: Vec<CandidateModel<E>>,
    ) -> Result<Selection<E>> {
        if roster.is_empty() {
            return Err(TrainerError::ConfigError(
                "model roster is empty".to_string(),
            ));
        }
        for (i, candidate) in roster.iter().enumerate() {
            if roster[..i].iter().any(|c| c.name == candidate.name) {
                return Err(TrainerError::ConfigError(format!(
                    "duplicate candidate name '{}'",
                    candidate.name
                )));
            }
        }

        let search = GridSearch::new(&self.cv, self.cv_scorer.as_ref());
        let mut report = ModelReport::default();
        let mut fitted: Vec<(String, E, ParamSet)> = Vec::with_capacity(roster.len());
        let mut searches = Vec::with_capacity(roster.len());

        for candidate in roster {
            let start = Instant::now();
            let tuned = search.search(&candidate.estimator, &candidate.grid, x_train, y_train)?;

            let mut model = candidate.estimator;
            tuned.best_params.apply(&mut model)?;
            model.fit(x_train, y_train)?;
            let y_pred = model.predict(x_test)?;
            let score = self.holdout_scorer.score(y_test, &y_pred)?;

            info!(
                model = %candidate.name,
                best_params = %tuned.best_params,
                cv_score = tuned.best_score,
                holdout_score = score,
                combinations = tuned.results.len(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Candidate evaluated"
            );

            report.insert(candidate.name.clone(), score);
            fitted.push((candidate.name, model, tuned.best_params.clone()));
            searches.push(tuned);
        }

        let best_idx = first_max(report.iter().map(|(_, s)| s)).ok_or_else(|| {
            TrainerError::TrainingError("model report is empty".to_string())
        })?;
        let best_score = report.entries[best_idx].1;
        let (best_model_name, best_model, best_params) = fitted.swap_remove(best_idx);

        debug!(report = ?report, "Model report");
        info!(
            model = %best_model_name,
            score = best_score,
            scorer = self.holdout_scorer.name(),
            "Best model selected"
        );

        Ok(Selection {
            report,
            best_model_name,
            best_model,
            best_score,
            best_params,
            searches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::{Classifier, DecisionTree, LogisticRegression, ParamGrid};
    use ndarray::array;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.0, 1.0], [0.1, 0.9], [0.2, 1.1], [0.3, 1.0], [0.2, 0.8], [0.1, 1.2],
            [1.0, 0.0], [1.1, 0.1], [0.9, 0.2], [1.2, 0.0], [1.0, 0.3], [0.8, 0.1],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_report_has_every_candidate() {
        let (x, y) = data();
        let roster = vec![
            CandidateModel::new(
                "tree",
                Classifier::from(DecisionTree::new_classifier()),
                ParamGrid::new().with("criterion", vec!["gini", "entropy"]),
            ),
            CandidateModel::new(
                "logistic",
                Classifier::from(LogisticRegression::new()),
                ParamGrid::new(),
            ),
        ];

        let selection = ModelSelector::default()
            .select(&x, &y, &x, &y, roster)
            .unwrap();

        assert_eq!(selection.report.len(), 2);
        assert_eq!(selection.report.names().collect::<Vec<_>>(), vec!["tree", "logistic"]);
        // both separate the data perfectly; first in roster order wins
        assert_eq!(selection.best_model_name, "tree");
        assert_eq!(selection.best_score, 1.0);
        assert_eq!(selection.report.get("tree"), Some(selection.best_score));
    }

    #[test]
    fn test_empty_roster() {
        let (x, y) = data();
        let err = ModelSelector::default()
            .select::<Classifier>(&x, &y, &x, &y, Vec::new())
            .unwrap_err();
        assert!(matches!(err, TrainerError::ConfigError(_)));
    }

    #[test]
    fn test_duplicate_names() {
        let (x, y) = data();
        let roster = vec![
            CandidateModel::new("tree", DecisionTree::new_classifier(), ParamGrid::new()),
            CandidateModel::new("tree", DecisionTree::new_classifier(), ParamGrid::new()),
        ];
        let err = ModelSelector::default()
            .select(&x, &y, &x, &y, roster)
            .unwrap_err();
        assert!(matches!(err, TrainerError::ConfigError(_)));
    }
}
