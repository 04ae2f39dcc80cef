//! Decision tree implementation (CART)

use super::models::{check_n_features, check_training_data, normalize, Classifier};
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

impl TreeNode {
    fn value_for(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    Mse,
}

impl Criterion {
    /// Impurity of a node from its count, target sum and target square sum.
    /// Gini and entropy assume 0/1 targets.
    fn impurity(self, count: f64, sum: f64, sq_sum: f64) -> f64 {
        if count <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => {
                let p = sum / count;
                2.0 * p * (1.0 - p)
            }
            Criterion::Entropy => {
                let p = sum / count;
                let h = |q: f64| if q > 0.0 { -q * q.ln() } else { 0.0 };
                h(p) + h(1.0 - p)
            }
            Criterion::Mse => (sq_sum / count - (sum / count).powi(2)).max(0.0),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gini" => Some(Criterion::Gini),
            "entropy" => Some(Criterion::Entropy),
            "mse" | "squared_error" => Some(Criterion::Mse),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Decision tree model.
///
/// As a [`Classifier`] the leaves hold the fraction of positive training rows
/// that reached them, which doubles as the probability estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn at random for every node; all when `None`
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for the per-node feature draw
    pub seed: u64,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
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
            seed: 42,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::Mse,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: Option<usize>) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_samples_leaf == 0 {
            return Err(WineError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_samples_split < 2 {
            return Err(WineError::InvalidParameter {
                name: "min_samples_split".to_string(),
                value: self.min_samples_split.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if self.max_features == Some(0) {
            return Err(WineError::InvalidParameter {
                name: "max_features".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fit on a multiset of row indices (duplicates allowed, as in a bootstrap
    /// sample). `leaf_value` maps the rows reaching a leaf to its output.
    pub(crate) fn fit_rows(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        rows: &[usize],
        leaf_value: &dyn Fn(&[usize]) -> f64,
    ) -> Result<()> {
        self.validate()?;
        if rows.is_empty() {
            return Err(WineError::TrainingError("no rows to fit a tree on".to_string()));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut builder = Builder {
            tree: &*self,
            x,
            y,
            leaf_value,
            rng: &mut rng,
            importances: &mut importances,
        };
        let root = builder.build(rows.to_vec(), 0);

        self.root = Some(root);
        self.feature_importances = Some(normalize(Array1::from_vec(importances)));
        Ok(())
    }

    /// Raw leaf values for every row
    pub fn predict_value(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(WineError::ModelNotFitted)?;
        check_n_features(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| root.value_for(row)).collect())
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }

    pub(crate) fn importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.criterion == Criterion::Mse {
            return Err(WineError::InvalidParameter {
                name: "criterion".to_string(),
                value: "mse".to_string(),
                reason: "classification needs gini or entropy".to_string(),
            });
        }
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.fit_rows(x, y, &indices, &|rows| mean_of(y, rows))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_value(x)?.mapv(|p| p.clamp(0.0, 1.0)))
    }

    fn name(&self) -> &str {
        "Decision Tree"
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

pub(crate) fn mean_of(y: &Array1<f64>, rows: &[usize]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    rows.iter().map(|&i| y[i]).sum::<f64>() / rows.len() as f64
}

/// Recursive tree construction state
struct Builder<'a> {
    tree: &'a DecisionTree,
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    leaf_value: &'a dyn Fn(&[usize]) -> f64,
    rng: &'a mut ChaCha8Rng,
    importances: &'a mut [f64],
}

impl Builder<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> TreeNode {
        let n_samples = rows.len();
        let (sum, sq_sum) = rows.iter().fold((0.0, 0.0), |(s, q), &i| {
            let v = self.y[i];
            (s + v, q + v * v)
        });
        let impurity = self.tree.criterion.impurity(n_samples as f64, sum, sq_sum);

        let should_stop = n_samples < self.tree.min_samples_split
            || n_samples < 2 * self.tree.min_samples_leaf
            || self.tree.max_depth.is_some_and(|d| depth >= d)
            || impurity <= 1e-12;

        let split = if should_stop { None } else { self.find_best_split(&rows, impurity) };

        let Some(split) = split else {
            return TreeNode::Leaf {
                value: (self.leaf_value)(&rows),
                n_samples,
            };
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| self.x[[i, split.feature_idx]] <= split.threshold);

        self.importances[split.feature_idx] += n_samples as f64 * split.gain;

        let left = Box::new(self.build(left_rows, depth + 1));
        let right = Box::new(self.build(right_rows, depth + 1));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n = self.tree.n_features;
        match self.tree.max_features {
            Some(k) if k < n => index::sample(&mut *self.rng, n, k).into_vec(),
            _ => (0..n).collect(),
        }
    }

    /// Sort rows by each candidate feature once and sweep every midpoint
    /// between distinct values, keeping running sums for the left side.
    fn find_best_split(&mut self, rows: &[usize], parent_impurity: f64) -> Option<SplitCandidate> {
        let criterion = self.tree.criterion;
        let min_leaf = self.tree.min_samples_leaf;
        let n = rows.len();
        let total_sum: f64 = rows.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = rows.iter().map(|&i| self.y[i] * self.y[i]).sum();

        let mut best: Option<SplitCandidate> = None;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature_idx in self.candidate_features() {
            pairs.clear();
            pairs.extend(rows.iter().map(|&i| (self.x[[i, feature_idx]], self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 0..n - 1 {
                let (value, target) = pairs[i];
                left_sum += target;
                left_sq += target * target;

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf {
                    continue;
                }
                if right_n < min_leaf {
                    break;
                }
                let next = pairs[i + 1].0;
                if next <= value {
                    continue;
                }

                let left_imp = criterion.impurity(left_n as f64, left_sum, left_sq);
                let right_imp = criterion.impurity(right_n as f64, total_sum - left_sum, total_sq - left_sq);
                let weighted = (left_n as f64 * left_imp + right_n as f64 * right_imp) / n as f64;
                let gain = parent_impurity - weighted;

                if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature_idx,
                        threshold: (value + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}
