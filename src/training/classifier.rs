//! Closed set of classifiers the selector can choose from

use super::adaboost::AdaBoostClassifier;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingClassifier;
use super::grid::ParamValue;
use super::logistic_regression::LogisticRegression;
use super::models::{Fittable, Tunable};
use super::random_forest::RandomForest;
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Any of the supported classifiers, serializable as one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingClassifier),
    LogisticRegression(LogisticRegression),
    AdaBoost(AdaBoostClassifier),
}

impl Classifier {
    /// Short algorithm name, independent of the roster label
    pub fn algorithm(&self) -> &'static str {
        match self {
            Classifier::RandomForest(_) => "random_forest",
            Classifier::DecisionTree(_) => "decision_tree",
            Classifier::GradientBoosting(_) => "gradient_boosting",
            Classifier::LogisticRegression(_) => "logistic_regression",
            Classifier::AdaBoost(_) => "adaboost",
        }
    }

    fn inner(&self) -> &dyn Fittable {
        match self {
            Classifier::RandomForest(m) => m,
            Classifier::DecisionTree(m) => m,
            Classifier::GradientBoosting(m) => m,
            Classifier::LogisticRegression(m) => m,
            Classifier::AdaBoost(m) => m,
        }
    }
}

impl Fittable for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => Fittable::fit(m, x, y),
            Classifier::DecisionTree(m) => Fittable::fit(m, x, y),
            Classifier::GradientBoosting(m) => Fittable::fit(m, x, y),
            Classifier::LogisticRegression(m) => Fittable::fit(m, x, y),
            Classifier::AdaBoost(m) => Fittable::fit(m, x, y),
        }
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner().predict(x)
    }
}

impl Tunable for Classifier {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => m.set_param(name, value),
            Classifier::DecisionTree(m) => m.set_param(name, value),
            Classifier::GradientBoosting(m) => m.set_param(name, value),
            Classifier::LogisticRegression(m) => m.set_param(name, value),
            Classifier::AdaBoost(m) => m.set_param(name, value),
        }
    }
}

impl From<RandomForest> for Classifier {
    fn from(m: RandomForest) -> Self {
        Classifier::RandomForest(m)
    }
}

impl From<DecisionTree> for Classifier {
    fn from(m: DecisionTree) -> Self {
        Classifier::DecisionTree(m)
    }
}

impl From<GradientBoostingClassifier> for Classifier {
    fn from(m: GradientBoostingClassifier) -> Self {
        Classifier::GradientBoosting(m)
    }
}

impl From<LogisticRegression> for Classifier {
    fn from(m: LogisticRegression) -> Self {
        Classifier::LogisticRegression(m)
    }
}

impl From<AdaBoostClassifier> for Classifier {
    fn from(m: AdaBoostClassifier) -> Self {
        Classifier::AdaBoost(m)
    }
}
