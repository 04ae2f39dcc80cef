//! Wine Quality - model comparison study
//!
//! Loads the red and white wine-quality datasets, derives a binary
//! "good wine" label (quality >= 6), explores the data, tunes seven
//! classifiers with cross-validated grid search and compares them on a
//! held-out test split by accuracy, F1 and ROC-AUC.
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Loading the semicolon-delimited files into a [`data::WineDataset`]
//! - [`explore`] - Summary statistics, quality distribution, correlations
//! - [`preprocessing`] - Stratified split and feature scaling
//!
//! ## Models
//! - [`training`] - Classifiers and cross-validation splitters
//! - [`tuning`] - Parameter grids and grid search
//! - [`evaluation`] - Confusion matrix, metrics and ROC curves
//!
//! ## Workflow
//! - [`comparison`] - The end-to-end comparison of all models
//! - [`report`] - Console, CSV, JSON, SVG and Markdown output
//! - [`config`] - Study configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod data;
pub mod explore;
pub mod preprocessing;

// Models
pub mod training;
pub mod tuning;
pub mod evaluation;

// Workflow
pub mod comparison;
pub mod report;
pub mod cli;

pub use error::{Result, WineError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, WineError};

    // Data
    pub use crate::data::{load_wine_csv, load_wine_pair, Origin, WineDataset, WineLoader};
    pub use crate::explore::{analyze, EdaReport};
    pub use crate::preprocessing::{train_test_split, Scaler, ScalerType};

    // Training
    pub use crate::training::{
        Classifier, CrossValidator, CVStrategy, DecisionTree, GradientBoostingClassifier, KNNClassifier,
        LogisticRegression, MLPClassifier, RandomForest, SVMClassifier,
    };

    // Tuning and evaluation
    pub use crate::tuning::{GridSearchCV, ParameterGrid, ParameterValue, Scoring, TrialParams};
    pub use crate::evaluation::{roc_auc, roc_curve, ClassificationMetrics, ConfusionMatrix};

    // Workflow
    pub use crate::comparison::{ComparisonTable, ModelComparison, ModelKind, ModelReport, StudyReport};
    pub use crate::config::StudyConfig;
}
