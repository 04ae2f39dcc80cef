//! Random Forest implementation

use super::decision_tree::{mean_of, Criterion, DecisionTree};
use super::models::{check_n_features, check_training_data, normalize, Classifier};
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    /// Features considered at each node, at least one
    pub fn resolve(self, n_features: usize) -> usize {
        let k = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }

    /// Parse `sqrt`, `log2`, `all`, an integer or a fraction in (0, 1]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqrt" => Some(MaxFeatures::Sqrt),
            "log2" => Some(MaxFeatures::Log2),
            "all" | "none" => Some(MaxFeatures::All),
            other => {
                if let Ok(n) = other.parse::<usize>() {
                    Some(MaxFeatures::Fixed(n))
                } else {
                    other
                        .parse::<f64>()
                        .ok()
                        .filter(|f| *f > 0.0 && *f <= 1.0)
                        .map(MaxFeatures::Fraction)
                }
            }
        }
    }
}

/// Random Forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per node
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Out-of-bag score
    pub oob_score: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: u64,
    /// Computed OOB accuracy
    oob_score_value: Option<f64>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Number of features
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            oob_score: false,
            criterion: Criterion::Gini,
            random_state: 42,
            oob_score_value: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
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

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Enable OOB score computation
    pub fn with_oob_score(mut self, oob_score: bool) -> Self {
        self.oob_score = oob_score;
        self
    }

    /// Out-of-bag accuracy of the last fit, when requested
    pub fn oob_score_value(&self) -> Option<f64> {
        self.oob_score_value
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn compute_feature_importances(&mut self) {
        let mut total = Array1::zeros(self.n_features);
        for imp in self.trees.iter().filter_map(|t| t.importances()) {
            total += imp;
        }
        self.feature_importances = Some(normalize(total));
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.n_estimators == 0 {
            return Err(WineError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let n_samples = x.nrows();
        self.n_features = x.ncols();
        let max_features = self.max_features.resolve(self.n_features);

        let mut trees = Vec::with_capacity(self.n_estimators);
        // Sum of OOB probabilities and vote count per row
        let mut oob_sum = vec![0.0; n_samples];
        let mut oob_count = vec![0usize; n_samples];

        for tree_idx in 0..self.n_estimators {
            let seed = self.random_state.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            let rows: Vec<usize> = if self.bootstrap {
                (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let mut tree = DecisionTree::new_classifier()
                .with_min_samples_split(self.min_samples_split)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_criterion(self.criterion)
                .with_max_features(Some(max_features))
                .with_seed(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            tree.max_depth = self.max_depth;
            tree.fit_rows(x, y, &rows, &|leaf_rows| mean_of(y, leaf_rows))?;

            if self.oob_score && self.bootstrap {
                let mut in_bag = vec![false; n_samples];
                for &r in &rows {
                    in_bag[r] = true;
                }
                let proba = tree.predict_value(x)?;
                for i in (0..n_samples).filter(|&i| !in_bag[i]) {
                    oob_sum[i] += proba[i];
                    oob_count[i] += 1;
                }
            }

            trees.push(tree);
        }

        self.trees = trees;
        self.compute_feature_importances();

        self.oob_score_value = if self.oob_score && self.bootstrap {
            let scored: Vec<(f64, f64)> = (0..n_samples)
                .filter(|&i| oob_count[i] > 0)
                .map(|i| (oob_sum[i] / oob_count[i] as f64, y[i]))
                .collect();
            if scored.is_empty() {
                None
            } else {
                let correct = scored
                    .iter()
                    .filter(|(p, t)| (if *p >= 0.5 { 1.0 } else { 0.0 }) == *t)
                    .count();
                Some(correct as f64 / scored.len() as f64)
            }
        } else {
            None
        };

        debug!(
            n_trees = self.trees.len(),
            max_features,
            oob = ?self.oob_score_value,
            "random forest fitted"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(WineError::ModelNotFitted);
        }
        check_n_features(x, self.n_features)?;

        let mut sum = Array1::zeros(x.nrows());
        for tree in &self.trees {
            sum += &tree.predict_value(x)?;
        }
        Ok((sum / self.trees.len() as f64).mapv(|p| p.clamp(0.0, 1.0)))
    }

    fn name(&self) -> &str {
        "Random Forest"
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }
}
