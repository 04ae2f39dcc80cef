//! The compared model families, their default grids and builders

use crate::error::{Result, WineError};
use crate::training::{
    Activation, Classifier, Criterion, DecisionTree, DistanceMetric, GradientBoostingClassifier,
    GradientBoostingConfig, KNNClassifier, KNNConfig, KernelType, LogisticRegression, MLPClassifier, MLPConfig,
    MaxFeatures, RandomForest, SVMClassifier, SVMConfig, WeightScheme,
};
use crate::tuning::{bool_param, float_param, string_param, usize_param, ParameterGrid, ParameterValue, TrialParams};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows used to tune the SVM; the kernel matrix grows quadratically
pub const DEFAULT_SVM_SEARCH_SAMPLES: usize = 1500;

/// One of the compared model families
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    LogisticRegression,
    DecisionTree,
    RandomForest,
    GradientBoosting,
    NeuralNetwork,
    Knn,
    Svm,
}

impl ModelKind {
    /// Every model, in report order
    pub fn all() -> [ModelKind; 7] {
        [
            ModelKind::LogisticRegression,
            ModelKind::DecisionTree,
            ModelKind::RandomForest,
            ModelKind::GradientBoosting,
            ModelKind::NeuralNetwork,
            ModelKind::Knn,
            ModelKind::Svm,
        ]
    }

    /// Human-readable name used in tables and plots
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::DecisionTree => "Decision Tree",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::NeuralNetwork => "Neural Network",
            ModelKind::Knn => "K-Nearest Neighbors",
            ModelKind::Svm => "Support Vector Machine",
        }
    }

    /// Identifier used on the command line and in config files
    pub fn key(self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "logistic_regression",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
            ModelKind::NeuralNetwork => "neural_network",
            ModelKind::Knn => "knn",
            ModelKind::Svm => "svm",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let kind = match s.trim().to_lowercase().replace('-', "_").as_str() {
            "logistic_regression" | "logistic" | "lr" => ModelKind::LogisticRegression,
            "decision_tree" | "tree" | "dt" => ModelKind::DecisionTree,
            "random_forest" | "forest" | "rf" => ModelKind::RandomForest,
            "gradient_boosting" | "gbm" | "gb" => ModelKind::GradientBoosting,
            "neural_network" | "mlp" | "nn" => ModelKind::NeuralNetwork,
            "knn" | "k_nearest_neighbors" => ModelKind::Knn,
            "svm" | "svc" => ModelKind::Svm,
            other => {
                return Err(WineError::InvalidParameter {
                    name: "model".to_string(),
                    value: other.to_string(),
                    reason: format!(
                        "expected one of {}",
                        ModelKind::all().iter().map(|k| k.key()).collect::<Vec<_>>().join(", ")
                    ),
                })
            }
        };
        Ok(kind)
    }

    /// Parse a comma-separated list, keeping order and dropping repeats
    pub fn parse_list(s: &str) -> Result<Vec<Self>> {
        let mut kinds = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let kind = Self::parse(part)?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }

    /// Whether the model reports feature importances
    pub fn is_tree_based(self) -> bool {
        matches!(
            self,
            ModelKind::DecisionTree | ModelKind::RandomForest | ModelKind::GradientBoosting
        )
    }

    /// Default cap on rows used for tuning
    pub fn default_max_samples(self) -> Option<usize> {
        match self {
            ModelKind::Svm => Some(DEFAULT_SVM_SEARCH_SAMPLES),
            _ => None,
        }
    }

    /// Default hyperparameter grid
    pub fn default_grid(self) -> ParameterGrid {
        match self {
            ModelKind::LogisticRegression => ParameterGrid::new().floats("alpha", &[0.0, 0.001, 0.01, 0.1]),
            ModelKind::DecisionTree => ParameterGrid::new()
                .ints("max_depth", &[3, 5, 8, 12])
                .ints("min_samples_leaf", &[1, 5, 20]),
            ModelKind::RandomForest => ParameterGrid::new()
                .ints("n_estimators", &[100])
                .add("max_features", [ParameterValue::from("sqrt"), ParameterValue::from(0.5)])
                .ints("min_samples_leaf", &[1, 5]),
            ModelKind::GradientBoosting => ParameterGrid::new()
                .ints("n_estimators", &[100, 200])
                .floats("learning_rate", &[0.05, 0.1])
                .ints("max_depth", &[3, 5]),
            ModelKind::NeuralNetwork => ParameterGrid::new()
                .ints("hidden_units", &[10, 25])
                .floats("alpha", &[1e-4, 1e-2]),
            ModelKind::Knn => ParameterGrid::new()
                .ints("n_neighbors", &[5, 11, 21, 31])
                .strings("weights", &["uniform", "distance"]),
            ModelKind::Svm => ParameterGrid::new()
                .floats("c", &[0.5, 1.0, 4.0])
                .floats("gamma", &[0.05, 0.1, 0.5]),
        }
    }

    /// Build an unfitted model from one grid combination.
    ///
    /// Parameters missing from `params` take the model defaults; unknown
    /// parameter names are ignored.
    pub fn build(self, params: &TrialParams, seed: u64) -> Result<Box<dyn Classifier>> {
        let model: Box<dyn Classifier> = match self {
            ModelKind::LogisticRegression => {
                let defaults = LogisticRegression::new();
                Box::new(
                    LogisticRegression::new()
                        .with_alpha(float_param(params, "alpha", defaults.alpha)?)
                        .with_max_iter(usize_param(params, "max_iter", defaults.max_iter)?)
                        .with_learning_rate(float_param(params, "learning_rate", defaults.learning_rate)?)
                        .with_tol(float_param(params, "tol", defaults.tol)?),
                )
            }
            ModelKind::DecisionTree => {
                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_split(usize_param(params, "min_samples_split", 2)?)
                    .with_min_samples_leaf(usize_param(params, "min_samples_leaf", 1)?)
                    .with_criterion(criterion_param(params)?)
                    .with_seed(seed);
                if let Some(depth) = optional_depth(params)? {
                    tree = tree.with_max_depth(depth);
                }
                Box::new(tree)
            }
            ModelKind::RandomForest => Box::new(
                RandomForest::new(usize_param(params, "n_estimators", 100)?)
                    .with_max_depth(optional_depth(params)?)
                    .with_min_samples_split(usize_param(params, "min_samples_split", 2)?)
                    .with_min_samples_leaf(usize_param(params, "min_samples_leaf", 1)?)
                    .with_max_features(max_features_param(params)?)
                    .with_criterion(criterion_param(params)?)
                    .with_bootstrap(bool_param(params, "bootstrap", true)?)
                    .with_random_state(seed),
            ),
            ModelKind::GradientBoosting => {
                let d = GradientBoostingConfig::default();
                Box::new(GradientBoostingClassifier::new(GradientBoostingConfig {
                    n_estimators: usize_param(params, "n_estimators", d.n_estimators)?,
                    learning_rate: float_param(params, "learning_rate", d.learning_rate)?,
                    max_depth: usize_param(params, "max_depth", d.max_depth)?,
                    min_samples_leaf: usize_param(params, "min_samples_leaf", d.min_samples_leaf)?,
                    subsample: float_param(params, "subsample", d.subsample)?,
                    colsample_bytree: float_param(params, "colsample_bytree", d.colsample_bytree)?,
                    reg_lambda: float_param(params, "reg_lambda", d.reg_lambda)?,
                    random_state: seed,
                }))
            }
            ModelKind::NeuralNetwork => {
                let d = MLPConfig::default();
                let activation = match params.get("activation") {
                    None => d.activation,
                    Some(v) => v
                        .as_string()
                        .and_then(Activation::parse)
                        .ok_or_else(|| invalid("activation", v, "expected relu, sigmoid or tanh"))?,
                };
                Box::new(MLPClassifier::new(MLPConfig {
                    hidden_layers: hidden_layers_param(params, &d.hidden_layers)?,
                    activation,
                    learning_rate: float_param(params, "learning_rate", d.learning_rate)?,
                    max_epochs: usize_param(params, "max_epochs", d.max_epochs)?,
                    batch_size: usize_param(params, "batch_size", d.batch_size)?,
                    alpha: float_param(params, "alpha", d.alpha)?,
                    random_state: seed,
                    ..d
                }))
            }
            ModelKind::Knn => {
                let weights = string_param(params, "weights", "uniform")?;
                let metric = string_param(params, "metric", "euclidean")?;
                Box::new(KNNClassifier::new(KNNConfig {
                    n_neighbors: usize_param(params, "n_neighbors", 5)?,
                    weights: WeightScheme::parse(weights).ok_or_else(|| {
                        invalid("weights", &ParameterValue::from(weights), "expected uniform or distance")
                    })?,
                    metric: DistanceMetric::parse(metric).ok_or_else(|| {
                        invalid("metric", &ParameterValue::from(metric), "expected euclidean or manhattan")
                    })?,
                }))
            }
            ModelKind::Svm => {
                let d = SVMConfig::default();
                let gamma = float_param(params, "gamma", 0.1)?;
                let kernel = match string_param(params, "kernel", "rbf")? {
                    "rbf" => KernelType::Rbf { gamma },
                    "linear" => KernelType::Linear,
                    "poly" | "polynomial" => KernelType::Polynomial {
                        degree: usize_param(params, "degree", 3)? as u32,
                        gamma,
                        coef0: float_param(params, "coef0", 0.0)?,
                    },
                    other => {
                        return Err(invalid(
                            "kernel",
                            &ParameterValue::from(other),
                            "expected rbf, linear or poly",
                        ))
                    }
                };
                Box::new(SVMClassifier::new(SVMConfig {
                    c: float_param(params, "c", d.c)?,
                    kernel,
                    max_iter: usize_param(params, "max_iter", d.max_iter)?,
                    random_state: seed,
                    ..d
                }))
            }
        };
        Ok(model)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

fn invalid(name: &str, value: &ParameterValue, reason: &str) -> WineError {
    WineError::InvalidParameter {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn criterion_param(params: &TrialParams) -> Result<Criterion> {
    let name = string_param(params, "criterion", "gini")?;
    match Criterion::parse(name) {
        Some(Criterion::Mse) | None => Err(invalid(
            "criterion",
            &ParameterValue::from(name),
            "expected gini or entropy",
        )),
        Some(c) => Ok(c),
    }
}

/// `max_depth`; absent or 0 means unlimited
fn optional_depth(params: &TrialParams) -> Result<Option<usize>> {
    let depth = usize_param(params, "max_depth", 0)?;
    Ok((depth > 0).then_some(depth))
}

fn max_features_param(params: &TrialParams) -> Result<MaxFeatures> {
    match params.get("max_features") {
        None => Ok(MaxFeatures::Sqrt),
        Some(ParameterValue::Int(n)) if *n > 0 => Ok(MaxFeatures::Fixed(*n as usize)),
        Some(ParameterValue::Float(f)) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
        Some(ParameterValue::String(s)) => MaxFeatures::parse(s)
            .ok_or_else(|| invalid("max_features", &ParameterValue::from(s.as_str()), "unrecognized value")),
        Some(other) => Err(invalid("max_features", other, "expected sqrt, log2, all, a count or a fraction")),
    }
}

/// `hidden_units` (one layer) or `hidden_layers` ("32,16")
fn hidden_layers_param(params: &TrialParams, default: &[usize]) -> Result<Vec<usize>> {
    if let Some(value) = params.get("hidden_layers") {
        let text = value.to_string();
        let layers: Option<Vec<usize>> = text
            .split(',')
            .map(|s| s.trim().parse::<usize>().ok().filter(|&n| n > 0))
            .collect();
        return layers.ok_or_else(|| invalid("hidden_layers", value, "expected comma-separated positive sizes"));
    }
    match params.get("hidden_units") {
        None => Ok(default.to_vec()),
        Some(_) => Ok(vec![usize_param(params, "hidden_units", 0)?]),
    }
}
