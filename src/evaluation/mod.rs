//! Model evaluation
//!
//! Confusion matrices, threshold metrics and ROC analysis for binary
//! classifiers.

mod metrics;
mod roc;

pub use metrics::{brier_score, log_loss, ClassificationMetrics, ConfusionMatrix};
pub use roc::{roc_auc, roc_curve, RocCurve, RocPoint};
