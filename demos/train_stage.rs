//! Model Trainer Stage Example
//!
//! Writes a small synthetic transformed dataset, then runs the trainer stage
//! against a local experiment tracker. Set `MLFLOW_TRACKING_URI` to log to an
//! MLflow server instead.

use ndarray::{s, Array2};
use netsec_trainer::logging::init_stdout_logging;
use netsec_trainer::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn synthetic(n_rows: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::<f64>::zeros((n_rows, n_features + 1));
    for i in 0..n_rows {
        let phishing = rng.gen_bool(0.4);
        for j in 0..n_features {
            let shift = if phishing { 1.0 } else { -1.0 };
            data[[i, j]] = shift + rng.gen_range(-1.5..1.5);
        }
        data[[i, n_features]] = if phishing { 1.0 } else { 0.0 };
    }
    data
}

fn main() -> anyhow::Result<()> {
    init_stdout_logging();

    let root = std::env::temp_dir().join("netsec_trainer_demo");
    let data = DataTransformationArtifact {
        transformed_train_file_path: root.join("data_transformation/transformed/train.npy"),
        transformed_test_file_path: root.join("data_transformation/transformed/test.npy"),
        transformed_object_file_path: root.join("data_transformation/transformed_object/preprocessing.pkl"),
    };

    let train = synthetic(200, 6, 1);
    let test = synthetic(60, 6, 2);
    save_array(&data.transformed_train_file_path, &train)?;
    save_array(&data.transformed_test_file_path, &test)?;

    let mut imputer = KnnImputer::new(3);
    imputer.fit(&train.slice(s![.., ..6]).to_owned())?;
    save_object(&data.transformed_object_file_path, &imputer)?;

    println!("Train: {:?}, test: {:?}", train.dim(), test.dim());

    let config = ModelTrainerConfig::new(root.join("model_trainer/trained_model/model.pkl"))
        .with_final_model_dir(root.join("final_model"));

    let artifact = match TrackingConfig::from_env() {
        Ok(tracking) => {
            let trainer: ModelTrainer =
                ModelTrainer::new(config, data, MlflowTracker::new(tracking)?);
            trainer.run()?
        }
        Err(_) => {
            let tracker = LocalTracker::new(root.join("mlruns"), "network-security")?;
            let trainer: ModelTrainer = ModelTrainer::new(config, data, tracker);
            trainer.run()?
        }
    };

    println!("\n{}", artifact);

    let pipeline: NetworkModel = load_object(&artifact.trained_model_file_path)?;
    let predictions = pipeline.predict(&test.slice(s![..5, ..6]).to_owned())?;
    println!("First predictions: {:?}", predictions);
    println!("Actual labels:     {:?}", test.slice(s![..5, 6]).to_vec());

    Ok(())
}
