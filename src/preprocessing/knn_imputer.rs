//! K-nearest-neighbour imputation of missing feature values

use super::{is_missing, Transform};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Candidate neighbour ordered by distance (max-heap keeps the farthest on top)
#[derive(Debug, Clone, Copy)]
struct Neighbor(f64, usize);

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// How neighbour values are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeighborWeights {
    Uniform,
    /// Inverse-distance weighting
    Distance,
}

/// Fills NaN cells with the average of that feature over the `n_neighbors`
/// closest fully observed training rows. Distances use the NaN-ignoring
/// euclidean metric; rows with no usable neighbour fall back to the
/// training mean.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    n_neighbors: usize,
    weights: NeighborWeights,
    donors: Option<Array2<f64>>,
    feature_means: Option<Array1<f64>>,
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            weights: NeighborWeights::Uniform,
            donors: None,
            feature_means: None,
        }
    }

    pub fn with_weights(mut self, weights: NeighborWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn is_fitted(&self) -> bool {
        self.donors.is_some()
    }

    fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let mut count = 0usize;
        let mut accum = 0.0;
        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            count += 1;
            accum += (ai - bi).powi(2);
        }
        if count == 0 {
            return f64::INFINITY;
        }
        // rescale to the full feature count, as if all coordinates were present
        (accum * a.len() as f64 / count as f64).sqrt()
    }

    fn neighbors(&self, donors: &Array2<f64>, sample: ArrayView1<f64>) -> Vec<Neighbor> {
        let mut heap = BinaryHeap::with_capacity(self.n_neighbors + 1);
        for (i, row) in donors.rows().into_iter().enumerate() {
            let dist = Self::distance(sample, row);
            if !dist.is_finite() {
                continue;
            }
            heap.push(Neighbor(dist, i));
            if heap.len() > self.n_neighbors {
                heap.pop();
            }
        }
        heap.into_vec()
    }

    fn impute_value(&self, donors: &Array2<f64>, neighbors: &[Neighbor], feature: usize, fallback: f64) -> f64 {
        if neighbors.is_empty() {
            return fallback;
        }
        match self.weights {
            NeighborWeights::Uniform => {
                neighbors.iter().map(|n| donors[[n.1, feature]]).sum::<f64>() / neighbors.len() as f64
            }
            NeighborWeights::Distance => {
                // an exact match dominates
                if let Some(exact) = neighbors.iter().find(|n| n.0 < 1e-12) {
                    return donors[[exact.1, feature]];
                }
                let (num, den) = neighbors.iter().fold((0.0, 0.0), |(num, den), n| {
                    let w = 1.0 / n.0;
                    (num + w * donors[[n.1, feature]], den + w)
                });
                num / den
            }
        }
    }
}

impl Transform for KnnImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let complete: Vec<usize> = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(_, row)| !row.iter().any(|&v| is_missing(v)))
            .map(|(i, _)| i)
            .collect();

        if complete.is_empty() {
            return Err(TrainerError::DataError(
                "no complete rows found for KNN imputation".to_string(),
            ));
        }

        let donors = x.select(Axis(0), &complete);
        let feature_means = donors.mean_axis(Axis(0)).ok_or_else(|| {
            TrainerError::DataError("failed to compute feature means".to_string())
        })?;

        self.donors = Some(donors);
        self.feature_means = Some(feature_means);
        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(donors), Some(means)) = (&self.donors, &self.feature_means) else {
            return Err(TrainerError::ModelNotFitted);
        };
        if x.ncols() != donors.ncols() {
            return Err(TrainerError::ShapeError {
                expected: format!("{} features", donors.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut result = x.clone();
        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }
            let neighbors = self.neighbors(donors, row);
            for (j, &v) in row.iter().enumerate() {
                if is_missing(v) {
                    result[[row_idx, j]] = self.impute_value(donors, &neighbors, j, means[j]);
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_imputes_from_nearest_rows() {
        let train = array![
            [1.0, 10.0],
            [1.1, 11.0],
            [0.9, 12.0],
            [9.0, 90.0],
            [9.1, 91.0],
        ];
        let mut imputer = KnnImputer::new(3);
        imputer.fit(&train).unwrap();

        let out = imputer.transform(&array![[1.0, f64::NAN]]).unwrap();
        assert!((out[[0, 1]] - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_complete_rows_pass_through() {
        let train = array![[1.0, 2.0], [3.0, 4.0]];
        let mut imputer = KnnImputer::default();
        let out = imputer.fit_transform(&train).unwrap();
        assert_eq!(out, train);
    }

    #[test]
    fn test_all_missing_row_uses_means() {
        let train = array![[1.0, 2.0], [3.0, 4.0]];
        let mut imputer = KnnImputer::new(1);
        imputer.fit(&train).unwrap();

        let out = imputer.transform(&array![[f64::NAN, f64::NAN]]).unwrap();
        assert_eq!(out, array![[2.0, 3.0]]);
    }

    #[test]
    fn test_distance_weights_prefer_exact_match() {
        let train = array![[0.0, 5.0], [1.0, 7.0], [2.0, 9.0]];
        let mut imputer = KnnImputer::new(3).with_weights(NeighborWeights::Distance);
        imputer.fit(&train).unwrap();

        let out = imputer.transform(&array![[1.0, f64::NAN]]).unwrap();
        assert_eq!(out[[0, 1]], 7.0);
    }

    #[test]
    fn test_not_fitted() {
        let imputer = KnnImputer::default();
        assert!(imputer.transform(&array![[1.0]]).is_err());
    }
}
