//! Candidate models and the default selection roster

use super::adaboost::AdaBoostClassifier;
use super::classifier::Classifier;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::grid::ParamGrid;
use super::logistic_regression::LogisticRegression;
use super::models::Estimator;
use super::random_forest::RandomForest;
use serde::{Deserialize, Serialize};

/// A named, untrained estimator together with the grid it is tuned over
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateModel<E> {
    pub name: String,
    pub estimator: E,
    pub grid: ParamGrid,
}

impl<E: Estimator> CandidateModel<E> {
    pub fn new(name: impl Into<String>, estimator: E, grid: ParamGrid) -> Self {
        Self {
            name: name.into(),
            estimator,
            grid,
        }
    }
}

pub const RANDOM_FOREST: &str = "Random Forest";
pub const DECISION_TREE: &str = "Decision Tree";
pub const GRADIENT_BOOSTING: &str = "Gradient Boosting";
pub const LOGISTIC_REGRESSION: &str = "Logistic Regression";
pub const ADABOOST: &str = "AdaBoost";

/// The five candidates in selection order, with their fixed grids.
///
/// `random_state` seeds every stochastic estimator so repeated runs select
/// the same model.
pub fn default_roster(random_state: Option<u64>) -> Vec<CandidateModel<Classifier>> {
    let mut forest = RandomForest::default();
    forest.random_state = random_state;

    let mut tree = DecisionTree::new_classifier();
    tree.random_state = random_state;

    let boosting = GradientBoostingClassifier::new(GradientBoostingConfig {
        random_state,
        ..Default::default()
    });

    vec![
        CandidateModel::new(
            RANDOM_FOREST,
            Classifier::from(forest),
            ParamGrid::new().with("n_estimators", vec![8i64, 16, 32, 128, 256]),
        ),
        CandidateModel::new(
            DECISION_TREE,
            Classifier::from(tree),
            ParamGrid::new().with("criterion", vec!["gini", "entropy", "log_loss"]),
        ),
        CandidateModel::new(
            GRADIENT_BOOSTING,
            Classifier::from(boosting),
            ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.05, 0.001])
                .with("subsample", vec![0.6, 0.7, 0.75, 0.85, 0.9])
                .with("n_estimators", vec![8i64, 16, 32, 64, 128, 256]),
        ),
        CandidateModel::new(
            LOGISTIC_REGRESSION,
            Classifier::from(LogisticRegression::new()),
            ParamGrid::new(),
        ),
        CandidateModel::new(
            ADABOOST,
            Classifier::from(AdaBoostClassifier::default()),
            ParamGrid::new()
                .with("learning_rate", vec![0.1, 0.01, 0.001])
                .with("n_estimators", vec![8i64, 16, 32, 64, 128, 256]),
        ),
    ]
}
