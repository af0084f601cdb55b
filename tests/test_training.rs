//! Integration test: candidate selection

use ndarray::{array, Array1, Array2};
use netsec_trainer::error::{ErrorKind, Result, TrainerError};
use netsec_trainer::training::grid::ParamValue;
use netsec_trainer::training::{
    default_roster, CandidateModel, Classifier, Fittable, ModelSelector, ParamGrid, Tunable,
    ADABOOST, DECISION_TREE, GRADIENT_BOOSTING, LOGISTIC_REGRESSION, RANDOM_FOREST,
};

/// Predicts the same label for every row
#[derive(Debug, Clone)]
struct ConstantModel {
    value: f64,
    fitted: bool,
}

impl ConstantModel {
    fn new(value: f64) -> Self {
        Self { value, fitted: false }
    }
}

impl Fittable for ConstantModel {
    fn fit(&mut self, _x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.fitted {
            return Err(TrainerError::ModelNotFitted);
        }
        Ok(Array1::from_elem(x.nrows(), self.value))
    }
}

impl Tunable for ConstantModel {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "value" => {
                self.value = value.as_f64(name)?;
                Ok(())
            }
            _ => Err(TrainerError::InvalidParameter {
                name: name.to_string(),
                value: value.to_string(),
                reason: "unknown".to_string(),
            }),
        }
    }
}

fn mostly_positive() -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
    let x_train = Array2::from_shape_fn((12, 2), |(i, j)| (i * 2 + j) as f64);
    let y_train = array![1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 0.0];
    let x_test = Array2::from_shape_fn((6, 2), |(i, j)| (i + j) as f64);
    let y_test = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
    (x_train, y_train, x_test, y_test)
}

fn separable() -> (Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>) {
    let x_train = array![
        [0.0, 1.0], [0.2, 0.9], [0.1, 1.1], [0.3, 0.8], [0.2, 1.2], [0.1, 0.7],
        [1.0, 0.0], [0.9, 0.2], [1.1, 0.1], [1.2, 0.3], [0.8, 0.1], [1.0, 0.2],
    ];
    let y_train = array![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
    let x_test = array![[0.1, 0.9], [0.2, 1.0], [1.0, 0.1], [0.9, 0.0]];
    let y_test = array![0.0, 0.0, 1.0, 1.0];
    (x_train, y_train, x_test, y_test)
}

#[test]
fn test_report_has_one_entry_per_candidate() {
    let (x_train, y_train, x_test, y_test) = separable();
    let selection = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, default_roster(Some(42)))
        .unwrap();

    let names: Vec<&str> = selection.report.names().collect();
    assert_eq!(
        names,
        vec![RANDOM_FOREST, DECISION_TREE, GRADIENT_BOOSTING, LOGISTIC_REGRESSION, ADABOOST]
    );

    let max = selection
        .report
        .iter()
        .map(|(_, s)| s)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(selection.best_score, max);
    assert_eq!(selection.report.get(&selection.best_model_name), Some(max));

    let evaluated: Vec<usize> = selection.searches.iter().map(|s| s.results.len()).collect();
    assert_eq!(evaluated, vec![5, 3, 120, 1, 18]);

    // winner is refitted and usable
    let predictions = selection.best_model.predict(&x_test).unwrap();
    assert_eq!(predictions.len(), 4);
}

#[test]
fn test_ties_go_to_first_candidate() {
    let (x_train, y_train, x_test, y_test) = mostly_positive();
    let roster = vec![
        CandidateModel::new("first", ConstantModel::new(1.0), ParamGrid::new()),
        CandidateModel::new("second", ConstantModel::new(1.0), ParamGrid::new()),
        CandidateModel::new("third", ConstantModel::new(0.0), ParamGrid::new()),
    ];

    let selection = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, roster)
        .unwrap();

    assert_eq!(selection.report.len(), 3);
    assert_eq!(selection.report.get("first"), selection.report.get("second"));
    assert_eq!(selection.best_model_name, "first");
}

#[test]
fn test_grid_search_picks_best_cv_value() {
    let (x_train, y_train, x_test, y_test) = mostly_positive();
    let roster = vec![CandidateModel::new(
        "constant",
        ConstantModel::new(0.0),
        ParamGrid::new().with("value", vec![0.0, 1.0]),
    )];

    let selection = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, roster)
        .unwrap();

    assert_eq!(selection.best_params.get("value"), Some(&ParamValue::Float(1.0)));
    assert_eq!(selection.best_model.value, 1.0);
}

#[test]
fn test_empty_grid_is_single_default_configuration() {
    let (x_train, y_train, x_test, y_test) = separable();
    let roster = vec![CandidateModel::new(
        LOGISTIC_REGRESSION,
        Classifier::from(netsec_trainer::training::LogisticRegression::new()),
        ParamGrid::new(),
    )];

    let selection = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, roster)
        .unwrap();

    assert_eq!(selection.report.len(), 1);
    assert!(selection.best_params.is_empty());
    assert_eq!(selection.best_model_name, LOGISTIC_REGRESSION);
}

#[test]
fn test_empty_roster_is_config_error() {
    let (x_train, y_train, x_test, y_test) = separable();
    let roster: Vec<CandidateModel<Classifier>> = Vec::new();
    let err = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, roster)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_duplicate_names_are_rejected() {
    let (x_train, y_train, x_test, y_test) = mostly_positive();
    let roster = vec![
        CandidateModel::new("same", ConstantModel::new(1.0), ParamGrid::new()),
        CandidateModel::new("same", ConstantModel::new(0.0), ParamGrid::new()),
    ];
    let err = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, roster)
        .unwrap_err();
    assert!(matches!(err, TrainerError::ConfigError(_)));
}

#[test]
fn test_unknown_grid_parameter_aborts_selection() {
    let (x_train, y_train, x_test, y_test) = mostly_positive();
    let roster = vec![CandidateModel::new(
        "constant",
        ConstantModel::new(0.0),
        ParamGrid::new().with("depth", vec![1i64]),
    )];
    let err = ModelSelector::default()
        .select(&x_train, &y_train, &x_test, &y_test, roster)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fit);
}
