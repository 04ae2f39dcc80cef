//! Model training module
//!
//! Binary classifiers behind one [`Classifier`] trait:
//! - Logistic regression
//! - Decision tree and Random Forest
//! - Gradient boosting
//! - Neural network (MLP)
//! - K-Nearest Neighbors
//! - Support Vector Machine with Platt scaling
//!
//! plus the cross-validation splitters used for tuning.

mod models;
mod platt;
pub mod cross_validation;
pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;
pub mod gradient_boosting;
pub mod knn;
pub mod neural_network;
pub mod svm;

pub use models::Classifier;
pub use platt::PlattScaling;
pub use cross_validation::{CrossValidator, CVStrategy, CVSplit, CVResults};
pub use linear_models::LogisticRegression;
pub use decision_tree::{DecisionTree, TreeNode, Criterion};
pub use random_forest::{RandomForest, MaxFeatures};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use knn::{KNNClassifier, KNNConfig, DistanceMetric, WeightScheme};
pub use neural_network::{MLPClassifier, MLPConfig, Activation};
pub use svm::{SVMClassifier, SVMConfig, KernelType, MAX_KERNEL_MATRIX_SAMPLES};

#[cfg(test)]
pub(crate) use models::fixtures;
