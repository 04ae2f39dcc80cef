//! Exploratory data analysis
//!
//! Summary statistics, quality distribution, label balance and feature/quality
//! correlations for a [`WineDataset`], overall and per origin.

use crate::data::{Origin, WineDataset};
use ndarray::{ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); `None` below two values
    pub std: Option<f64>,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FeatureSummary {
    /// Summarize a column. Returns `None` for an empty column.
    pub fn from_values(name: impl Into<String>, values: ArrayView1<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
            Some(var.sqrt())
        } else {
            None
        };

        Some(Self {
            name: name.into(),
            count: n,
            mean,
            std,
            min: sorted[0],
            q1: quantile_sorted(&sorted, 0.25),
            median: quantile_sorted(&sorted, 0.5),
            q3: quantile_sorted(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Linear-interpolated quantile of an ascending slice
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Pearson correlation; `None` if either side has zero variance
pub fn pearson(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
    let n = a.len();
    if n < 2 || n != b.len() {
        return None;
    }
    let mean_a = a.sum() / n as f64;
    let mean_b = b.sum() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a <= f64::EPSILON || var_b <= f64::EPSILON {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Correlation of one feature with the quality score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityCorrelation {
    pub feature: String,
    pub r: Option<f64>,
}

/// Per-origin section of the EDA
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginProfile {
    pub origin: Origin,
    pub n_samples: usize,
    pub negatives: usize,
    pub positives: usize,
    /// Count of samples per integer quality score
    pub quality_counts: BTreeMap<i64, usize>,
    pub features: Vec<FeatureSummary>,
}

/// Full EDA result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdaReport {
    pub n_samples: usize,
    pub n_features: usize,
    pub label_threshold: f64,
    pub negatives: usize,
    pub positives: usize,
    pub quality_counts: BTreeMap<i64, usize>,
    pub features: Vec<FeatureSummary>,
    pub by_origin: Vec<OriginProfile>,
    /// Sorted by absolute correlation, strongest first
    pub correlations: Vec<QualityCorrelation>,
}

impl EdaReport {
    /// Share of positive labels, `None` for an empty dataset
    pub fn positive_rate(&self) -> Option<f64> {
        if self.n_samples == 0 {
            None
        } else {
            Some(self.positives as f64 / self.n_samples as f64)
        }
    }
}

fn quality_counts(dataset: &WineDataset) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &q in dataset.quality.iter() {
        *counts.entry(q.round() as i64).or_insert(0) += 1;
    }
    counts
}

fn feature_summaries(dataset: &WineDataset) -> Vec<FeatureSummary> {
    dataset
        .feature_names
        .iter()
        .zip(dataset.features.axis_iter(Axis(1)))
        .filter_map(|(name, col)| FeatureSummary::from_values(name.clone(), col))
        .collect()
}

/// Run the exploratory analysis
pub fn analyze(dataset: &WineDataset) -> EdaReport {
    let (negatives, positives) = dataset.class_balance();

    let by_origin = Origin::all()
        .into_iter()
        .map(|origin| {
            let subset = dataset.filter_origin(origin);
            let (neg, pos) = subset.class_balance();
            OriginProfile {
                origin,
                n_samples: subset.n_samples(),
                negatives: neg,
                positives: pos,
                quality_counts: quality_counts(&subset),
                features: feature_summaries(&subset),
            }
        })
        .filter(|p| p.n_samples > 0)
        .collect();

    let mut correlations: Vec<QualityCorrelation> = dataset
        .feature_names
        .iter()
        .zip(dataset.features.axis_iter(Axis(1)))
        .map(|(name, col)| QualityCorrelation {
            feature: name.clone(),
            r: pearson(col, dataset.quality.view()),
        })
        .collect();
    correlations.sort_by(|a, b| {
        let ka = a.r.map(f64::abs).unwrap_or(-1.0);
        let kb = b.r.map(f64::abs).unwrap_or(-1.0);
        kb.total_cmp(&ka)
    });

    EdaReport {
        n_samples: dataset.n_samples(),
        n_features: dataset.n_features(),
        label_threshold: dataset.label_threshold,
        negatives,
        positives,
        quality_counts: quality_counts(dataset),
        features: feature_summaries(dataset),
        by_origin,
        correlations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn sample() -> WineDataset {
        WineDataset::new(
            array![[1.0, 5.0], [2.0, 5.0], [3.0, 5.0], [4.0, 5.0]],
            array![4.0, 5.0, 6.0, 7.0],
            vec![Origin::Red, Origin::Red, Origin::White, Origin::White],
            vec!["alcohol".to_string(), "flat".to_string()],
            6.0,
        )
        .unwrap()
    }

    #[test]
    fn test_feature_summary() {
        let values = array![1.0, 2.0, 3.0, 4.0];
        let s = FeatureSummary::from_values("x", values.view()).unwrap();
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.std.unwrap() - 1.2909944487).abs() < 1e-9);
        assert!((s.median - 2.5).abs() < 1e-12);
        assert!((s.q1 - 1.75).abs() < 1e-12);
        assert!((s.q3 - 3.25).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let values = array![3.0];
        let s = FeatureSummary::from_values("x", values.view()).unwrap();
        assert!(s.std.is_none());
    }

    #[test]
    fn test_pearson() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![2.0, 4.0, 6.0];
        let c = array![3.0, 2.0, 1.0];
        let flat = array![1.0, 1.0, 1.0];
        assert!((pearson(a.view(), b.view()).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(a.view(), c.view()).unwrap() + 1.0).abs() < 1e-12);
        assert!(pearson(a.view(), flat.view()).is_none());
    }

    #[test]
    fn test_analyze() {
        let report = analyze(&sample());
        assert_eq!(report.n_samples, 4);
        assert_eq!((report.negatives, report.positives), (2, 2));
        assert_eq!(report.positive_rate(), Some(0.5));
        assert_eq!(report.quality_counts.get(&6), Some(&1));
        assert_eq!(report.by_origin.len(), 2);
        assert_eq!(report.by_origin[1].positives, 2);

        assert_eq!(report.correlations[0].feature, "alcohol");
        assert!(report.correlations[1].r.is_none());
    }
}
