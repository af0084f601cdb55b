use crate::error::Result;
use crate::preprocessing::{KnnImputer, Transform};
use crate::training::{Classifier, Fittable};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A fitted preprocessor followed by a trained model. Built once after
/// selection and never refitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferencePipeline<P, M> {
    preprocessor: P,
    model: M,
}

/// The pipeline the trainer stage persists
pub type NetworkModel = InferencePipeline<KnnImputer, Classifier>;

impl<P: Transform, M: Fittable> InferencePipeline<P, M> {
    pub fn new(preprocessor: P, model: M) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    /// `model.predict(preprocessor.transform(x))`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let transformed = self.preprocessor.transform(x)?;
        self.model.predict(&transformed)
    }

    pub fn preprocessor(&self) -> &P {
        &self.preprocessor
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}
