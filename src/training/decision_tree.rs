//! CART decision tree for classification and regression
//!
//! Splits are found with a single sorted sweep per feature, keeping running
//! class counts (or sums for regression) on each side of the threshold.

use super::grid::ParamValue;
use super::models::{check_xy, class_index, unique_classes, unknown_param, Fittable, Tunable};
use crate::error::{Result, TrainerError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Shannon entropy (classification)
    Entropy,
    /// Log loss; splits identically to entropy
    LogLoss,
    /// Mean squared error (regression)
    MSE,
}

impl Criterion {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gini" => Some(Criterion::Gini),
            "entropy" => Some(Criterion::Entropy),
            "log_loss" => Some(Criterion::LogLoss),
            "squared_error" | "mse" => Some(Criterion::MSE),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
            Criterion::LogLoss => "log_loss",
            Criterion::MSE => "squared_error",
        }
    }

    fn is_classification(&self) -> bool {
        !matches!(self, Criterion::MSE)
    }
}

/// Sufficient statistics of the targets reaching one side of a split
#[derive(Debug, Clone)]
struct NodeStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl NodeStats {
    fn empty(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, target: f64, class: Option<usize>) {
        self.count += 1;
        self.sum += target;
        self.sq_sum += target * target;
        if let Some(c) = class {
            self.class_counts[c] += 1;
        }
    }

    fn minus(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            count: self.count - other.count,
            sum: self.sum - other.sum,
            sq_sum: self.sq_sum - other.sq_sum,
            class_counts: self
                .class_counts
                .iter()
                .zip(other.class_counts.iter())
                .map(|(a, b)| a - b)
                .collect(),
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy | Criterion::LogLoss => -self
                .class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }

    fn is_pure(&self, criterion: Criterion) -> bool {
        if criterion.is_classification() {
            self.class_counts.iter().filter(|&&c| c > 0).count() <= 1
        } else {
            self.impurity(criterion) <= 1e-14
        }
    }

    /// Majority class index; ties go to the lowest class
    fn majority(&self) -> usize {
        let mut best = 0;
        for (i, &c) in self.class_counts.iter().enumerate() {
            if c > self.class_counts[best] {
                best = i;
            }
        }
        best
    }
}

struct Candidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth (unbounded when `None`)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (all when `None`)
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
    n_features: usize,
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            ..Self::new_classifier()
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn is_classifier(&self) -> bool {
        self.criterion.is_classification()
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        check_xy(x, y)?;
        if self.min_samples_leaf == 0 {
            return Err(TrainerError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = x.ncols();

        let class_ids: Option<Vec<usize>> = if self.is_classifier() {
            self.classes = unique_classes(y);
            Some(
                y.iter()
                    .map(|&v| class_index(&self.classes, v).unwrap_or(0))
                    .collect(),
            )
        } else {
            self.classes.clear();
            None
        };

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut builder = TreeBuilder {
            tree: self,
            x,
            y,
            class_ids: class_ids.as_deref(),
            rng: &mut rng,
        };
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let root = builder.build(&indices, 0);

        self.root = Some(root);
        Ok(self)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(TrainerError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(TrainerError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| Self::predict_sample(root, row))
            .collect())
    }

    fn predict_sample(mut node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if sample[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

struct TreeBuilder<'a> {
    tree: &'a DecisionTree,
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    class_ids: Option<&'a [usize]>,
    rng: &'a mut ChaCha8Rng,
}

impl TreeBuilder<'_> {
    fn n_classes(&self) -> usize {
        self.tree.classes.len()
    }

    fn stats(&self, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::empty(self.n_classes());
        for &i in indices {
            stats.add(self.y[i], self.class_ids.map(|ids| ids[i]));
        }
        stats
    }

    fn leaf(&self, stats: &NodeStats) -> TreeNode {
        let value = if self.tree.is_classifier() {
            self.tree.classes.get(stats.majority()).copied().unwrap_or(0.0)
        } else if stats.count > 0 {
            stats.sum / stats.count as f64
        } else {
            0.0
        };
        TreeNode::Leaf {
            value,
            n_samples: stats.count,
        }
    }

    fn build(&mut self, indices: &[usize], depth: usize) -> TreeNode {
        let tree = self.tree;
        let stats = self.stats(indices);

        let should_stop = indices.len() < tree.min_samples_split
            || indices.len() < 2 * tree.min_samples_leaf
            || tree.max_depth.map_or(false, |d| depth >= d)
            || stats.is_pure(tree.criterion);
        if should_stop {
            return self.leaf(&stats);
        }

        let features = self.candidate_features();
        let Some(best) = self.best_split(indices, &stats, &features) else {
            return self.leaf(&stats);
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, best.feature_idx]] <= best.threshold);

        let left = Box::new(self.build(&left_idx, depth + 1));
        let right = Box::new(self.build(&right_idx, depth + 1));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples: indices.len(),
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.tree.max_features {
            Some(m) if m > 0 && m < n_features => {
                let mut chosen = sample(&mut *self.rng, n_features, m).into_vec();
                chosen.sort_unstable();
                chosen
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split(
        &self,
        indices: &[usize],
        parent: &NodeStats,
        features: &[usize],
    ) -> Option<Candidate> {
        let criterion = self.tree.criterion;
        let min_leaf = self.tree.min_samples_leaf;
        let parent_impurity = parent.impurity(criterion);
        let n = indices.len() as f64;

        let per_feature: Vec<Option<Candidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| {
                    self.x[[a, feature_idx]]
                        .partial_cmp(&self.x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut left = NodeStats::empty(parent.class_counts.len());
                let mut best: Option<Candidate> = None;

                for pos in 0..order.len() - 1 {
                    let i = order[pos];
                    left.add(self.y[i], self.class_ids.map(|ids| ids[i]));

                    let here = self.x[[i, feature_idx]];
                    let next = self.x[[order[pos + 1], feature_idx]];
                    if next <= here {
                        continue;
                    }
                    let n_left = pos + 1;
                    if n_left < min_leaf || order.len() - n_left < min_leaf {
                        continue;
                    }

                    let right = parent.minus(&left);
                    let weighted = (left.count as f64 * left.impurity(criterion)
                        + right.count as f64 * right.impurity(criterion))
                        / n;
                    let gain = parent_impurity - weighted;

                    if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                        best = Some(Candidate {
                            feature_idx,
                            threshold: (here + next) / 2.0,
                            gain,
                        });
                    }
                }
                best
            })
            .collect();

        // first feature wins ties
        per_feature.into_iter().flatten().fold(None, |acc, c| match acc {
            Some(b) if b.gain >= c.gain => Some(b),
            _ => Some(c),
        })
    }
}

impl Fittable for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTree::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTree::predict(self, x)
    }
}

impl Tunable for DecisionTree {
    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "criterion" => {
                let raw = value.as_str(name)?;
                self.criterion =
                    Criterion::from_name(raw).ok_or_else(|| TrainerError::InvalidParameter {
                        name: name.to_string(),
                        value: raw.to_string(),
                        reason: "unknown criterion".to_string(),
                    })?;
            }
            "max_depth" => self.max_depth = Some(value.as_usize(name)?),
            "min_samples_split" => self.min_samples_split = value.as_usize(name)?,
            "min_samples_leaf" => self.min_samples_leaf = value.as_usize(name)?,
            "max_features" => self.max_features = Some(value.as_usize(name)?),
            _ => return Err(unknown_param("DecisionTree", name, value)),
        }
        Ok(())
    }
}
