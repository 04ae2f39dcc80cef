//! ROC curve and area under it

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One operating point of a scoring classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Scores >= threshold are called positive; infinite for the (0, 0) point
    pub threshold: f64,
}

/// Receiver operating characteristic curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

impl RocCurve {
    /// (fpr, tpr) pairs for plotting
    pub fn xy(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.fpr, p.tpr)).collect()
    }
}

/// Build the ROC curve from labels in {0, 1} and positive-class scores.
///
/// Thresholds sweep the distinct scores from high to low; tied scores move
/// together, producing a diagonal segment. Returns `None` when either class is
/// absent or a score is NaN.
pub fn roc_curve(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<RocCurve> {
    if y_true.len() != scores.len() || scores.iter().any(|s| s.is_nan()) {
        return None;
    }

    let n_pos = y_true.iter().filter(|&&y| y > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut points = Vec::with_capacity(order.len() + 1);
    points.push(RocPoint { fpr: 0.0, tpr: 0.0, threshold: f64::INFINITY });

    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        while i < order.len() && scores[order[i]] == threshold {
            if y_true[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            fpr: fp as f64 / n_neg as f64,
            tpr: tp as f64 / n_pos as f64,
            threshold,
        });
    }

    let auc = trapezoid(&points);
    Some(RocCurve { points, auc })
}

/// Area under the ROC curve; `None` when it is undefined
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> Option<f64> {
    roc_curve(y_true, scores).map(|c| c.auc)
}

fn trapezoid(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_ranking() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&y, &s).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reversed_ranking() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.9, 0.8, 0.2, 0.1];
        assert!(roc_auc(&y, &s).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_constant_scores_give_half() {
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0];
        let s = array![0.5, 0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y, &s).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_known_auc() {
        // one discordant pair out of four
        let y = array![0.0, 0.0, 1.0, 1.0];
        let s = array![0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&y, &s).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_is_none() {
        let y = array![1.0, 1.0];
        let s = array![0.3, 0.7];
        assert!(roc_curve(&y, &s).is_none());
    }

    #[test]
    fn test_curve_endpoints_and_monotonic() {
        let y = array![0.0, 1.0, 0.0, 1.0, 1.0, 0.0];
        let s = array![0.3, 0.7, 0.3, 0.9, 0.2, 0.6];
        let curve = roc_curve(&y, &s).unwrap();
        let first = curve.points.first().unwrap();
        let last = curve.points.last().unwrap();
        assert_eq!((first.fpr, first.tpr), (0.0, 0.0));
        assert_eq!((last.fpr, last.tpr), (1.0, 1.0));
        for w in curve.points.windows(2) {
            assert!(w[1].fpr >= w[0].fpr && w[1].tpr >= w[0].tpr);
        }
        // distinct scores: 0.9, 0.7, 0.6, 0.3, 0.2 -> 5 points plus origin
        assert_eq!(curve.points.len(), 6);
    }
}
