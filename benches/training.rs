use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::{Array1, Array2};
use netsec_trainer::training::{
    CandidateModel, Classifier, DecisionTree, Fittable, GradientBoostingClassifier,
    GradientBoostingConfig, ModelSelector, ParamGrid, RandomForest,
};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn create_classification_data(n_rows: usize, n_features: usize) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let x = Array2::from_shape_fn((n_rows, n_features), |_| rng.gen::<f64>() * 10.0);
    let y = x
        .rows()
        .into_iter()
        .map(|row| if row.sum() + rng.gen::<f64>() > 5.0 * n_features as f64 { 1.0 } else { 0.0 })
        .collect();
    (x, y)
}

fn bench_decision_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("decision_tree_fit");

    for size in [100, 1000, 5000].iter() {
        let (x, y) = create_classification_data(*size, 10);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut tree = DecisionTree::new_classifier();
                tree.fit(black_box(&x), black_box(&y)).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_random_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_forest_fit");
    group.sample_size(10);

    for n_trees in [8, 32, 128].iter() {
        let (x, y) = create_classification_data(1000, 10);
        group.bench_with_input(BenchmarkId::from_parameter(n_trees), n_trees, |b, &n| {
            b.iter(|| {
                let mut forest = RandomForest::new_classifier(n);
                forest.random_state = Some(42);
                Fittable::fit(&mut forest, black_box(&x), black_box(&y)).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_gradient_boosting(c: &mut Criterion) {
    let (x, y) = create_classification_data(1000, 10);
    c.bench_function("gradient_boosting_fit_64", |b| {
        b.iter(|| {
            let mut model = GradientBoostingClassifier::new(GradientBoostingConfig {
                n_estimators: 64,
                ..Default::default()
            });
            Fittable::fit(&mut model, black_box(&x), black_box(&y)).unwrap();
        })
    });
}

fn bench_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("model_selection");
    group.sample_size(10);

    let (x_train, y_train) = create_classification_data(500, 8);
    let (x_test, y_test) = create_classification_data(150, 8);
    let roster = vec![
        CandidateModel::new(
            "Decision Tree",
            Classifier::from(DecisionTree::new_classifier()),
            ParamGrid::new().with("criterion", vec!["gini", "entropy", "log_loss"]),
        ),
        CandidateModel::new(
            "Random Forest",
            Classifier::from(RandomForest::new_classifier(16)),
            ParamGrid::new().with("n_estimators", vec![8i64, 16]),
        ),
    ];
    let selector = ModelSelector::new(3, Some(42));

    group.bench_function("tree_and_forest", |b| {
        b.iter(|| {
            selector
                .select(&x_train, &y_train, &x_test, &y_test, roster.clone())
                .unwrap()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_decision_tree,
    bench_random_forest,
    bench_gradient_boosting,
    bench_selection
);
criterion_main!(benches);
