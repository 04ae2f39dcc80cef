//! Cross-validation implementations

use crate::error::{Result, WineError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Cross-validation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 5, shuffle: true }
    }
}

impl CVStrategy {
    pub fn n_splits(&self) -> usize {
        match self {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => *n_splits,
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
    random_state: u64,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: 42,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn strategy(&self) -> CVStrategy {
        self.strategy
    }

    /// Generate train/test splits. Stratification reads the labels in `y`.
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        let n_splits = self.strategy.n_splits();
        if n_splits < 2 {
            return Err(WineError::ValidationError("n_splits must be at least 2".to_string()));
        }
        if n_samples < n_splits {
            return Err(WineError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let folds = match self.strategy {
            CVStrategy::KFold { shuffle, .. } => k_fold_assign(n_samples, n_splits, shuffle, &mut rng),
            CVStrategy::StratifiedKFold { shuffle, .. } => stratified_assign(y, n_splits, shuffle, &mut rng),
        };

        Ok(folds_to_splits(folds))
    }
}

fn k_fold_assign(n_samples: usize, n_splits: usize, shuffle: bool, rng: &mut ChaCha8Rng) -> Vec<Vec<usize>> {
    let mut indices: Vec<usize> = (0..n_samples).collect();
    if shuffle {
        indices.shuffle(rng);
    }

    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;
    let mut folds = Vec::with_capacity(n_splits);
    let mut current = 0;
    for i in 0..n_splits {
        let fold_size = if i < remainder { base + 1 } else { base };
        folds.push(indices[current..current + fold_size].to_vec());
        current += fold_size;
    }
    folds
}

/// Deal every class round-robin over the folds, continuing the rotation
/// across classes so fold sizes differ by at most one.
fn stratified_assign(y: &Array1<f64>, n_splits: usize, shuffle: bool, rng: &mut ChaCha8Rng) -> Vec<Vec<usize>> {
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        class_indices.entry(val.round() as i64).or_default().push(idx);
    }

    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
    let mut offset = 0;
    for (class, indices) in class_indices.iter_mut() {
        if indices.len() < n_splits {
            warn!(class, members = indices.len(), n_splits, "class smaller than the number of folds");
        }
        if shuffle {
            indices.shuffle(rng);
        }
        for &idx in indices.iter() {
            folds[offset % n_splits].push(idx);
            offset += 1;
        }
    }
    folds
}

fn folds_to_splits(folds: Vec<Vec<usize>>) -> Vec<CVSplit> {
    (0..folds.len())
        .map(|fold_idx| CVSplit {
            train_indices: folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect(),
            test_indices: folds[fold_idx].clone(),
            fold_idx,
        })
        .collect()
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each scored fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of scored folds
    pub n_folds: usize,
    /// Folds whose score was undefined
    pub n_skipped: usize,
}

impl CVResults {
    /// Create CV results from fold scores; `None` when no fold was scored
    pub fn from_scores(scores: Vec<f64>) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;

        Some(Self {
            scores,
            mean_score,
            std_score: variance.sqrt(),
            n_folds,
            n_skipped: 0,
        })
    }

    pub fn with_skipped(mut self, n_skipped: usize) -> Self {
        self.n_skipped = n_skipped;
        self
    }
}
