//! Binary classification metrics
//!
//! Every ratio metric is an `Option`: it is `None` when the ratio is undefined
//! (for example precision with no positive predictions), never a panic.

use super::roc::roc_auc;
use crate::error::{Result, WineError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probability clamp used for log loss
const EPS: f64 = 1e-15;

/// 2x2 confusion matrix for labels in {0, 1}
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Count outcomes; values above 0.5 are treated as the positive class
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        check_lengths(y_true, y_pred)?;

        let mut cm = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.tp + self.tn, self.total())
    }

    pub fn precision(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Sensitivity / true positive rate
    pub fn recall(&self) -> Option<f64> {
        ratio(self.tp, self.tp + self.fn_)
    }

    /// True negative rate
    pub fn specificity(&self) -> Option<f64> {
        ratio(self.tn, self.tn + self.fp)
    }

    pub fn f1(&self) -> Option<f64> {
        let p = self.precision()?;
        let r = self.recall()?;
        if p + r > 0.0 {
            Some(2.0 * p * r / (p + r))
        } else {
            None
        }
    }

    pub fn balanced_accuracy(&self) -> Option<f64> {
        Some((self.recall()? + self.specificity()?) / 2.0)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>10} {:>10}", "", "pred 0", "pred 1")?;
        writeln!(f, "{:>14} {:>10} {:>10}", "actual 0", self.tn, self.fp)?;
        write!(f, "{:>14} {:>10} {:>10}", "actual 1", self.fn_, self.tp)
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

fn check_lengths(a: &Array1<f64>, b: &Array1<f64>) -> Result<()> {
    if a.len() != b.len() {
        return Err(WineError::ShapeError {
            expected: format!("{} predictions", a.len()),
            actual: format!("{} predictions", b.len()),
        });
    }
    if a.is_empty() {
        return Err(WineError::EvaluationError("no samples to evaluate".to_string()));
    }
    Ok(())
}

/// Mean binary cross-entropy; `None` for non-finite probabilities
pub fn log_loss(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Option<f64> {
    if y_true.len() != y_prob.len() || y_true.is_empty() {
        return None;
    }
    let mut total = 0.0;
    for (&y, &p) in y_true.iter().zip(y_prob.iter()) {
        if !p.is_finite() {
            return None;
        }
        let p = p.clamp(EPS, 1.0 - EPS);
        total -= if y > 0.5 { p.ln() } else { (1.0 - p).ln() };
    }
    Some(total / y_true.len() as f64)
}

/// Mean squared error between probabilities and labels
pub fn brier_score(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Option<f64> {
    if y_true.len() != y_prob.len() || y_true.is_empty() {
        return None;
    }
    let sum: f64 = y_true
        .iter()
        .zip(y_prob.iter())
        .map(|(&y, &p)| (p - y).powi(2))
        .sum();
    let score = sum / y_true.len() as f64;
    score.is_finite().then_some(score)
}

/// Metrics for evaluating a binary classifier on one dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub confusion: ConfusionMatrix,
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub specificity: Option<f64>,
    pub f1_score: Option<f64>,
    pub balanced_accuracy: Option<f64>,
    pub auc_roc: Option<f64>,
    pub log_loss: Option<f64>,
    pub brier_score: Option<f64>,
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Compute all metrics from labels, hard predictions and positive-class scores
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, y_prob: &Array1<f64>) -> Result<Self> {
        let confusion = ConfusionMatrix::from_predictions(y_true, y_pred)?;
        check_lengths(y_true, y_prob)?;

        Ok(Self {
            confusion,
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            specificity: confusion.specificity(),
            f1_score: confusion.f1(),
            balanced_accuracy: confusion.balanced_accuracy(),
            auc_roc: roc_auc(y_true, y_prob),
            log_loss: log_loss(y_true, y_prob),
            brier_score: brier_score(y_true, y_prob),
            n_samples: y_true.len(),
        })
    }

    /// Threshold probabilities at 0.5 and compute all metrics
    pub fn from_probabilities(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Result<Self> {
        let y_pred = y_prob.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
        Self::compute(y_true, &y_pred, y_prob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_confusion_counts() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(cm, ConfusionMatrix { tp: 3, fp: 1, tn: 3, fn_: 1 });
        assert_eq!(cm.accuracy(), Some(0.75));
        assert_eq!(cm.precision(), Some(0.75));
        assert_eq!(cm.recall(), Some(0.75));
        assert!((cm.f1().unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_precision_is_none() {
        let y_true = array![1.0, 0.0, 1.0];
        let y_pred = array![0.0, 0.0, 0.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(cm.precision(), None);
        assert_eq!(cm.recall(), Some(0.0));
        assert_eq!(cm.f1(), None);
        assert!(cm.accuracy().is_some());
    }

    #[test]
    fn test_no_positive_labels() {
        let y_true = array![0.0, 0.0];
        let y_pred = array![0.0, 1.0];
        let cm = ConfusionMatrix::from_predictions(&y_true, &y_pred).unwrap();
        assert_eq!(cm.recall(), None);
        assert_eq!(cm.balanced_accuracy(), None);
        assert_eq!(cm.specificity(), Some(0.5));
    }

    #[test]
    fn test_length_mismatch() {
        let err = ConfusionMatrix::from_predictions(&array![1.0, 0.0], &array![1.0]);
        assert!(matches!(err, Err(WineError::ShapeError { .. })));
    }

    #[test]
    fn test_metrics_in_unit_interval() {
        let y_true = array![1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let y_prob = array![0.9, 0.2, 0.4, 0.6, 0.8, 0.1];
        let m = ClassificationMetrics::from_probabilities(&y_true, &y_prob).unwrap();
        for v in [m.accuracy, m.precision, m.recall, m.f1_score, m.auc_roc, m.brier_score]
            .into_iter()
            .flatten()
        {
            assert!((0.0..=1.0).contains(&v));
        }
        assert!(m.log_loss.unwrap() > 0.0);
        assert_eq!(m.n_samples, 6);
    }

    #[test]
    fn test_log_loss_perfect_is_small() {
        let y = array![1.0, 0.0];
        let p = array![1.0, 0.0];
        assert!(log_loss(&y, &p).unwrap() < 1e-10);
    }
}
