//! K-Nearest Neighbors classifier
//!
//! Brute-force search keeping the k closest training rows in a bounded
//! max-heap.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::models::{check_n_features, check_training_data, Classifier};
use crate::error::{Result, WineError};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    #[default]
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

impl DistanceMetric {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "euclidean" | "l2" => Some(Self::Euclidean),
            "manhattan" | "l1" => Some(Self::Manhattan),
            _ => None,
        }
    }
}

/// Weighting scheme for neighbors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// All neighbors have equal weight
    #[default]
    Uniform,
    /// Closer neighbors have more weight (inverse distance)
    Distance,
}

impl WeightScheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uniform" => Some(Self::Uniform),
            "distance" => Some(Self::Distance),
            _ => None,
        }
    }

    fn weight(self, dist: f64) -> f64 {
        match self {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / (dist + 1e-10),
        }
    }
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Weighting scheme
    pub weights: WeightScheme,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNClassifier {
    config: KNNConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl Default for KNNClassifier {
    fn default() -> Self {
        Self::new(KNNConfig::default())
    }
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &KNNConfig {
        &self.config
    }
}

impl Classifier for KNNClassifier {
    /// Stores the training data; k larger than the training set is clamped at
    /// prediction time.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        if self.config.n_neighbors == 0 {
            return Err(WineError::InvalidParameter {
                name: "n_neighbors".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (x_train, y_train) = match (&self.x_train, &self.y_train) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(WineError::ModelNotFitted),
        };
        check_n_features(x, x_train.ncols())?;

        let k = self.config.n_neighbors.min(x_train.nrows());
        Ok(x
            .rows()
            .into_iter()
            .map(|row| {
                let neighbors = find_k_nearest(row, x_train, y_train, k, self.config.metric);
                positive_share(&neighbors, self.config.weights)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "k-Nearest Neighbors"
    }
}

/// Max-heap entry for partial sort (keeps k smallest distances)
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}

impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Find k nearest neighbors using a max-heap, O(n log k)
fn find_k_nearest(
    point: ArrayView1<f64>,
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (row, &label) in x_train.rows().into_iter().zip(y_train.iter()) {
        let dist = compute_distance(point, row, metric);
        if heap.len() < k {
            heap.push(DistLabel(dist, label));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, label));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

/// Compute distance between two points using the specified metric
fn compute_distance(a: ArrayView1<f64>, b: ArrayView1<f64>, metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
    }
}

/// Weighted share of positive neighbours
fn positive_share(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let mut positive = 0.0;
    let mut total = 0.0;
    for &(dist, label) in neighbors {
        let w = weights.weight(dist);
        if label > 0.5 {
            positive += w;
        }
        total += w;
    }
    if total > 0.0 {
        positive / total
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec(
            (20, 2),
            vec![
                // Class 0 (low values)
                1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0, 1.5, 2.5, 2.0, 1.5, 2.5, 1.0, 1.2, 1.8, 1.8,
                1.2, //
                // Class 1 (high values)
                8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0, 8.5, 9.5, 9.0, 8.5, 9.5, 8.0, 8.2, 8.8, 8.8,
                8.2,
            ],
        )
        .unwrap();

        let y = Array1::from_iter((0..20).map(|i| if i < 10 { 0.0 } else { 1.0 }));
        (x, y)
    }

    #[test]
    fn test_knn_classifier() {
        let (x, y) = create_classification_data();

        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let predictions = knn.predict(&x).unwrap();
        assert_eq!(predictions, y, "separable data should be classified perfectly");
    }

    #[test]
    fn test_probability_is_neighbor_share() {
        let x = array![[0.0], [1.0], [2.0], [10.0]];
        let y = array![1.0, 0.0, 1.0, 0.0];
        let mut knn = KNNClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let p = knn.predict_proba(&array![[1.0]]).unwrap();
        assert!((p[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_weights_favor_close_points() {
        let x = array![[0.0], [0.1], [5.0], [5.2]];
        let y = array![1.0, 1.0, 0.0, 0.0];
        let mut knn = KNNClassifier::new(KNNConfig {
            n_neighbors: 4,
            weights: WeightScheme::Distance,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();

        let p = knn.predict_proba(&array![[0.5]]).unwrap();
        assert!(p[0] > 0.8);
    }

    #[test]
    fn test_distance_metrics() {
        let a = array![0.0, 0.0];
        let b = array![3.0, 4.0];
        assert!((compute_distance(a.view(), b.view(), DistanceMetric::Euclidean) - 5.0).abs() < 1e-12);
        assert!((compute_distance(a.view(), b.view(), DistanceMetric::Manhattan) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_training_set() {
        let x = array![[0.0], [1.0]];
        let y = array![1.0, 0.0];
        let mut knn = KNNClassifier::with_k(10);
        knn.fit(&x, &y).unwrap();
        let p = knn.predict_proba(&array![[0.2]]).unwrap();
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_not_fitted() {
        let knn = KNNClassifier::with_k(3);
        assert!(matches!(knn.predict(&array![[0.0]]), Err(WineError::ModelNotFitted)));
    }
}
