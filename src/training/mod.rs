//! Model training module
//!
//! Provides the classifier roster and the machinery to choose among it:
//! - Decision trees and Random Forests
//! - Gradient boosting and AdaBoost
//! - Logistic regression
//! - Grid search with (stratified) k-fold cross-validation
//! - The model trainer stage that ties selection, tracking and persistence

mod artifact;
mod classifier;
mod config;
mod models;
mod roster;
mod selector;
mod trainer;
pub mod adaboost;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod grid;
pub mod logistic_regression;
pub mod metrics;
pub mod random_forest;

pub use artifact::{DataTransformationArtifact, ModelTrainerArtifact};
pub use classifier::Classifier;
pub use config::ModelTrainerConfig;
pub use models::{Estimator, Fittable, Tunable};
pub use roster::{
    default_roster, CandidateModel, ADABOOST, DECISION_TREE, GRADIENT_BOOSTING,
    LOGISTIC_REGRESSION, RANDOM_FOREST,
};
pub use selector::{ModelReport, ModelSelector, Selection};
pub use trainer::{metric_entries, split_features_label, ModelTrainer};
pub use adaboost::AdaBoostClassifier;
pub use cross_validation::{CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use grid::{CvResult, GridSearch, GridSearchResult, ParamGrid, ParamSet, ParamValue};
pub use logistic_regression::LogisticRegression;
pub use metrics::{classification_score, Accuracy, ClassificationMetrics, R2Score, Scorer};
pub use random_forest::{MaxFeatures, RandomForest};
