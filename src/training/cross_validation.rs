//! Cross-validation splitters

use crate::error::{Result, TrainerError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (keeps class proportions per fold)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold {
            n_splits: 3,
            shuffle: false,
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for shuffled strategies
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn strategy(&self) -> &CVStrategy {
        &self.strategy
    }

    pub fn n_splits(&self) -> usize {
        match self.strategy {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => {
                n_splits
            }
        }
    }

    /// Generate train/test splits. Stratified strategies require `y`.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        let n_splits = self.n_splits();
        if n_splits < 2 {
            return Err(TrainerError::ConfigError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(TrainerError::TrainingError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let folds = match &self.strategy {
            CVStrategy::KFold { shuffle, .. } => self.k_fold(n_samples, n_splits, *shuffle),
            CVStrategy::StratifiedKFold { shuffle, .. } => {
                let y = y.ok_or_else(|| {
                    TrainerError::ConfigError(
                        "StratifiedKFold requires target array".to_string(),
                    )
                })?;
                if y.len() != n_samples {
                    return Err(TrainerError::ShapeError {
                        expected: format!("{} targets", n_samples),
                        actual: format!("{} targets", y.len()),
                    });
                }
                self.stratified_k_fold(y, n_splits, *shuffle)
            }
        };

        Ok(folds_to_splits(folds))
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn k_fold(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Vec<Vec<usize>> {
        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;

        let mut folds = Vec::with_capacity(n_splits);
        let mut current = 0;
        for i in 0..n_splits {
            let size = if i < remainder { base + 1 } else { base };
            folds.push(indices[current..current + size].to_vec());
            current += size;
        }
        folds
    }

    fn stratified_k_fold(&self, y: &Array1<f64>, n_splits: usize, shuffle: bool) -> Vec<Vec<usize>> {
        // BTreeMap keeps class iteration order stable
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if shuffle {
            let mut rng = self.rng();
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Round-robin with a running offset so fold sizes differ by at most one
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut offset = 0;
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[(offset + i) % n_splits].push(idx);
            }
            offset += indices.len();
        }

        for fold in &mut folds {
            fold.sort_unstable();
        }
        folds
    }
}

impl Default for CrossValidator {
    fn default() -> Self {
        Self::new(CVStrategy::default())
    }
}

fn folds_to_splits(folds: Vec<Vec<usize>>) -> Vec<CVSplit> {
    (0..folds.len())
        .map(|fold_idx| CVSplit {
            test_indices: folds[fold_idx].clone(),
            train_indices: folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect(),
            fold_idx,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(CVStrategy::KFold {
            n_splits: 3,
            shuffle: false,
        });
        let splits = cv.split(10, None).unwrap();

        assert_eq!(splits.len(), 3);
        assert_eq!(splits[0].test_indices, vec![0, 1, 2, 3]);
        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 10);
        }
    }

    #[test]
    fn test_shuffled_k_fold_is_reproducible() {
        let cv = CrossValidator::new(CVStrategy::KFold {
            n_splits: 4,
            shuffle: true,
        })
        .with_random_state(42);

        let a = cv.split(20, None).unwrap();
        let b = cv.split(20, None).unwrap();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_stratified_k_fold_balances_classes() {
        let y = array![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let cv = CrossValidator::default();
        let splits = cv.split(9, Some(&y)).unwrap();

        assert_eq!(splits.len(), 3);
        for split in &splits {
            assert_eq!(split.test_indices.len(), 3);
            let positives = split.test_indices.iter().filter(|&&i| y[i] > 0.5).count();
            assert_eq!(positives, 1);
        }
    }

    #[test]
    fn test_stratified_requires_targets() {
        let cv = CrossValidator::default();
        assert!(matches!(
            cv.split(9, None).unwrap_err(),
            TrainerError::ConfigError(_)
        ));
    }

    #[test]
    fn test_too_few_samples() {
        let cv = CrossValidator::default();
        let y = array![0.0, 1.0];
        assert!(cv.split(2, Some(&y)).is_err());
    }
}
