//! Upstream preprocessing objects the inference pipeline wraps

mod knn_imputer;

pub use knn_imputer::{KnnImputer, NeighborWeights};

use crate::error::Result;
use ndarray::Array2;

/// A fitted feature transformation
pub trait Transform: Send + Sync {
    /// Learn whatever state the transformation needs
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Apply the fitted transformation
    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

/// Missing values are encoded as NaN
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}
