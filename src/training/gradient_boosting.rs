//! Gradient Boosting implementation
//!
//! Binary log-loss boosting of regression trees. Each round fits a tree to the
//! pseudo-residuals `y - p` on a row/column subsample, sets every leaf to a
//! Newton step, and then updates the score of every training row.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::decision_tree::DecisionTree;
use super::models::{check_n_features, check_training_data, normalize, sigmoid, Classifier};
use crate::error::{Result, WineError};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Subsample ratio for each tree
    pub subsample: f64,
    /// Column subsample ratio
    pub colsample_bytree: f64,
    /// L2 regularization on leaf values
    pub reg_lambda: f64,
    /// Random seed
    pub random_state: u64,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 1.0,
            random_state: 42,
        }
    }
}

impl GradientBoostingConfig {
    fn validate(&self) -> Result<()> {
        let check = |name: &str, value: f64, ok: bool, reason: &str| {
            if ok {
                Ok(())
            } else {
                Err(WineError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: reason.to_string(),
                })
            }
        };
        check("n_estimators", self.n_estimators as f64, self.n_estimators > 0, "must be at least 1")?;
        check("learning_rate", self.learning_rate, self.learning_rate > 0.0, "must be positive")?;
        check("subsample", self.subsample, self.subsample > 0.0 && self.subsample <= 1.0, "must be in (0, 1]")?;
        check(
            "colsample_bytree",
            self.colsample_bytree,
            self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0,
            "must be in (0, 1]",
        )?;
        check("reg_lambda", self.reg_lambda, self.reg_lambda >= 0.0, "must be non-negative")
    }
}

/// Gradient Boosting Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    /// Training log loss after each round
    train_loss: Vec<f64>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self::new(GradientBoostingConfig::default())
    }
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            col_indices_per_tree: Vec::new(),
            initial_log_odds: 0.0,
            n_features: 0,
            feature_importances: None,
            train_loss: Vec::new(),
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Training log loss recorded after every boosting round
    pub fn train_loss(&self) -> &[f64] {
        &self.train_loss
    }

    /// Raw additive score (log-odds) for every row
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(WineError::ModelNotFitted);
        }
        check_n_features(x, self.n_features)?;

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let x_sub = x.select(Axis(1), col_indices);
            log_odds.scaled_add(self.config.learning_rate, &tree.predict_value(&x_sub)?);
        }
        Ok(log_odds)
    }

    fn sample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        let sample_size = (((n as f64) * ratio).ceil() as usize).clamp(1, n);
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

fn log_loss(y: &Array1<f64>, log_odds: &Array1<f64>) -> f64 {
    let total: f64 = y
        .iter()
        .zip(log_odds.iter())
        .map(|(&yi, &f)| {
            let p = sigmoid(f).clamp(1e-15, 1.0 - 1e-15);
            -(yi * p.ln() + (1.0 - yi) * (1.0 - p).ln())
        })
        .sum();
    total / y.len() as f64
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.config.validate()?;

        let n_samples = x.nrows();
        let n_features = x.ncols();
        self.n_features = n_features;
        self.trees.clear();
        self.col_indices_per_tree.clear();
        self.train_loss.clear();

        let p = y.mean().unwrap_or(0.5).clamp(1e-6, 1.0 - 1e-6);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        let mut importances = Array1::zeros(n_features);
        let reg_lambda = self.config.reg_lambda;

        for round in 0..self.config.n_estimators {
            let probs = log_odds.mapv(sigmoid);
            let residuals = y - &probs;
            let hessians = probs.mapv(|p| p * (1.0 - p));

            let rows = Self::sample_indices(n_samples, self.config.subsample, &mut rng);
            let cols = Self::sample_indices(n_features, self.config.colsample_bytree, &mut rng);
            let x_sub = x.select(Axis(1), &cols);

            let newton = |leaf_rows: &[usize]| {
                let g: f64 = leaf_rows.iter().map(|&i| residuals[i]).sum();
                let h: f64 = leaf_rows.iter().map(|&i| hessians[i]).sum();
                g / (h + reg_lambda).max(1e-12)
            };

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf)
                .with_seed(self.config.random_state.wrapping_add(round as u64));
            tree.fit_rows(&x_sub, &residuals, &rows, &newton)?;

            // Every row moves, not only the sampled ones
            log_odds.scaled_add(self.config.learning_rate, &tree.predict_value(&x_sub)?);

            if let Some(tree_importance) = tree.importances() {
                for (j, &col_idx) in cols.iter().enumerate() {
                    importances[col_idx] += tree_importance[j];
                }
            }

            self.train_loss.push(log_loss(y, &log_odds));
            self.trees.push(tree);
            self.col_indices_per_tree.push(cols);
        }

        self.feature_importances = Some(normalize(importances));
        debug!(
            rounds = self.trees.len(),
            final_loss = self.train_loss.last().copied().unwrap_or(f64::NAN),
            "gradient boosting fitted"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    fn name(&self) -> &str {
        "Gradient Boosting"
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::fixtures::{accuracy, separable};
    use ndarray::array;

    fn small_config() -> GradientBoostingConfig {
        GradientBoostingConfig {
            n_estimators: 30,
            max_depth: 3,
            ..Default::default()
        }
    }

    #[test]
    fn test_gradient_boosting_classifier() {
        let (x, y) = separable(200, 21);
        let mut gbm = GradientBoostingClassifier::new(small_config());
        gbm.fit(&x, &y).unwrap();

        let pred = gbm.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.9);
    }

    #[test]
    fn test_training_loss_decreases() {
        let (x, y) = separable(200, 22);
        let mut gbm = GradientBoostingClassifier::new(GradientBoostingConfig {
            subsample: 1.0,
            colsample_bytree: 1.0,
            ..small_config()
        });
        gbm.fit(&x, &y).unwrap();

        let loss = gbm.train_loss();
        assert_eq!(loss.len(), 30);
        assert!(loss[loss.len() - 1] < loss[0]);
    }

    #[test]
    fn test_initial_prior() {
        let x = array![[0.0], [0.0], [0.0], [0.0]];
        let y = array![1.0, 1.0, 1.0, 0.0];
        let mut gbm = GradientBoostingClassifier::new(small_config());
        gbm.fit(&x, &y).unwrap();
        // a constant feature gives no split, so only the prior and leaf steps remain
        let p = gbm.predict_proba(&x).unwrap();
        assert!((p[0] - 0.75).abs() < 0.05, "p = {}", p[0]);
    }

    #[test]
    fn test_invalid_subsample() {
        let (x, y) = separable(20, 23);
        let mut gbm = GradientBoostingClassifier::new(GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        });
        assert!(matches!(gbm.fit(&x, &y), Err(WineError::InvalidParameter { .. })));
    }

    #[test]
    fn test_not_fitted() {
        let gbm = GradientBoostingClassifier::default();
        assert!(matches!(gbm.predict_proba(&array![[1.0]]), Err(WineError::ModelNotFitted)));
    }
}
