//! Support Vector Machine classifier
//!
//! Binary C-SVC trained with SMO (Sequential Minimal Optimization) over a
//! precomputed kernel matrix and a cached error vector. Probabilities come
//! from Platt scaling of the decision values.

use super::models::{check_n_features, check_training_data, Classifier};
use super::platt::PlattScaling;
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2, ArrayView1};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Maximum number of samples for eager kernel matrix computation.
/// Beyond this, training will return an error to prevent OOM.
pub const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// Kernel function type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Polynomial kernel: K(x, y) = (γ * x · y + r)^d
    Polynomial { degree: u32, gamma: f64, coef0: f64 },
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    Rbf { gamma: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Rbf { gamma: 0.1 }
    }
}

impl KernelType {
    fn compute(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self {
            KernelType::Linear => a.dot(&b),
            KernelType::Polynomial { degree, gamma, coef0 } => {
                (gamma * a.dot(&b) + coef0).powi(*degree as i32)
            }
            KernelType::Rbf { gamma } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * norm_sq).exp()
            }
        }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    /// Tolerance for KKT violations
    pub tol: f64,
    /// Maximum number of passes over the data
    pub max_iter: usize,
    /// Random seed for fallback partner selection
    pub random_state: u64,
    /// Fit a Platt sigmoid for probabilities
    pub probability: bool,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::default(),
            tol: 1e-3,
            max_iter: 200,
            random_state: 42,
            probability: true,
        }
    }
}

/// Fitted support vectors and their weights
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SupportSet {
    vectors: Array2<f64>,
    /// alpha_i * y_i for every support vector
    coefficients: Array1<f64>,
    bias: f64,
}

/// Support Vector Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMClassifier {
    config: SVMConfig,
    support: Option<SupportSet>,
    platt: Option<PlattScaling>,
    n_features: usize,
}

impl Default for SVMClassifier {
    fn default() -> Self {
        Self::new(SVMConfig::default())
    }
}

impl SVMClassifier {
    /// Create a new SVM classifier
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            support: None,
            platt: None,
            n_features: 0,
        }
    }

    pub fn config(&self) -> &SVMConfig {
        &self.config
    }

    /// Signed distance to the separating surface; positive means class 1
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let support = self.support.as_ref().ok_or(WineError::ModelNotFitted)?;
        check_n_features(x, self.n_features)?;

        Ok(x.rows()
            .into_iter()
            .map(|sample| {
                support
                    .vectors
                    .rows()
                    .into_iter()
                    .zip(support.coefficients.iter())
                    .map(|(sv, &coef)| coef * self.config.kernel.compute(sample, sv))
                    .sum::<f64>()
                    + support.bias
            })
            .collect())
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let val = self.config.kernel.compute(x.row(i), x.row(j));
                k[[i, j]] = val;
                k[[j, i]] = val;
            }
        }
        k
    }

    fn validate(&self) -> Result<()> {
        if self.config.c <= 0.0 {
            return Err(WineError::InvalidParameter {
                name: "c".to_string(),
                value: self.config.c.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if let KernelType::Rbf { gamma } | KernelType::Polynomial { gamma, .. } = self.config.kernel {
            if gamma <= 0.0 {
                return Err(WineError::InvalidParameter {
                    name: "gamma".to_string(),
                    value: gamma.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// SMO working state over one training set
struct Smo<'a> {
    k: &'a Array2<f64>,
    y: Array1<f64>,
    alphas: Array1<f64>,
    /// f(x_i) - y_i for every row
    errors: Array1<f64>,
    bias: f64,
    c: f64,
}

impl Smo<'_> {
    fn violates_kkt(&self, i: usize, tol: f64) -> bool {
        let r = self.y[i] * self.errors[i];
        (r < -tol && self.alphas[i] < self.c) || (r > tol && self.alphas[i] > 0.0)
    }

    /// Second-choice heuristic: maximize |E_i - E_j|
    fn pick_partner(&self, i: usize) -> Option<usize> {
        let e_i = self.errors[i];
        self.errors
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .max_by(|a, b| (e_i - a.1).abs().total_cmp(&(e_i - b.1).abs()))
            .map(|(j, _)| j)
    }

    /// Jointly optimize alphas i and j; returns whether they moved
    fn take_step(&mut self, i: usize, j: usize) -> bool {
        if i == j {
            return false;
        }
        let (y_i, y_j) = (self.y[i], self.y[j]);
        let (e_i, e_j) = (self.errors[i], self.errors[j]);
        let (alpha_i_old, alpha_j_old) = (self.alphas[i], self.alphas[j]);
        let c = self.c;

        let (l, h) = if y_i != y_j {
            ((alpha_j_old - alpha_i_old).max(0.0), (c + alpha_j_old - alpha_i_old).min(c))
        } else {
            ((alpha_i_old + alpha_j_old - c).max(0.0), (alpha_i_old + alpha_j_old).min(c))
        };
        if h - l < 1e-10 {
            return false;
        }

        let k = self.k;
        let eta = 2.0 * k[[i, j]] - k[[i, i]] - k[[j, j]];
        if eta >= 0.0 {
            return false;
        }

        let alpha_j = (alpha_j_old - y_j * (e_i - e_j) / eta).clamp(l, h);
        if (alpha_j - alpha_j_old).abs() < 1e-5 * (alpha_j + alpha_j_old + 1e-5) {
            return false;
        }
        let alpha_i = alpha_i_old + y_i * y_j * (alpha_j_old - alpha_j);

        let d_i = y_i * (alpha_i - alpha_i_old);
        let d_j = y_j * (alpha_j - alpha_j_old);

        let b1 = self.bias - e_i - d_i * k[[i, i]] - d_j * k[[i, j]];
        let b2 = self.bias - e_j - d_i * k[[i, j]] - d_j * k[[j, j]];
        let new_bias = if alpha_i > 0.0 && alpha_i < c {
            b1
        } else if alpha_j > 0.0 && alpha_j < c {
            b2
        } else {
            (b1 + b2) / 2.0
        };
        let d_b = new_bias - self.bias;

        // Error cache update
        let row_i = k.row(i);
        let row_j = k.row(j);
        for (idx, e) in self.errors.iter_mut().enumerate() {
            *e += d_i * row_i[idx] + d_j * row_j[idx] + d_b;
        }

        self.alphas[i] = alpha_i;
        self.alphas[j] = alpha_j;
        self.bias = new_bias;
        true
    }
}

impl Classifier for SVMClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n = x.nrows();
        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(WineError::TrainingError(format!(
                "Dataset has {} samples, exceeding the maximum {} for SVM kernel matrix. \
                 Consider subsampling or using a different algorithm.",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        let y_signed = y.mapv(|v| if v > 0.5 { 1.0 } else { -1.0 });
        let n_pos = y_signed.iter().filter(|&&v| v > 0.0).count();
        if n_pos == 0 || n_pos == n {
            return Err(WineError::TrainingError(
                "SVM requires both classes in the training set".to_string(),
            ));
        }

        let kernel_matrix = self.compute_kernel_matrix(x);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);

        // All alphas start at zero, so f(x_i) = 0 and E_i = -y_i
        let mut smo = Smo {
            k: &kernel_matrix,
            errors: -&y_signed,
            y: y_signed,
            alphas: Array1::zeros(n),
            bias: 0.0,
            c: self.config.c,
        };

        let max_passes = 5;
        let mut passes = 0;
        let mut total_iter = 0;

        while passes < max_passes && total_iter < self.config.max_iter {
            let mut num_changed = 0;

            for i in 0..n {
                if !smo.violates_kkt(i, self.config.tol) {
                    continue;
                }
                let mut changed = smo.pick_partner(i).is_some_and(|j| smo.take_step(i, j));
                if !changed {
                    let j = rng.gen_range(0..n);
                    changed = smo.take_step(i, j);
                }
                if changed {
                    num_changed += 1;
                }
            }

            total_iter += 1;
            if num_changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
        }

        if total_iter >= self.config.max_iter {
            warn!(max_iter = self.config.max_iter, "SMO stopped before convergence");
        }

        let support_indices: Vec<usize> = (0..n).filter(|&i| smo.alphas[i] > 1e-8).collect();
        let coefficients: Array1<f64> = support_indices
            .iter()
            .map(|&i| smo.alphas[i] * smo.y[i])
            .collect();
        let vectors = x.select(ndarray::Axis(0), &support_indices);

        self.n_features = x.ncols();
        self.support = Some(SupportSet {
            vectors,
            coefficients,
            bias: smo.bias,
        });

        // Training decision values are f(x_i) = E_i + y_i
        self.platt = if self.config.probability {
            let scores = &smo.errors + &smo.y;
            let mut platt = PlattScaling::new();
            platt.fit(&scores, y)?;
            Some(platt)
        } else {
            None
        };

        debug!(
            n_support = support_indices.len(),
            passes = total_iter,
            "svm fitted"
        );
        Ok(())
    }

    /// Platt-scaled probabilities; without calibration a logistic squash of
    /// the decision value.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let scores = self.decision_function(x)?;
        match &self.platt {
            Some(platt) => platt.transform(&scores),
            None => Ok(scores.mapv(super::models::sigmoid)),
        }
    }

    fn name(&self) -> &str {
        "Support Vector Machine"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::fixtures::{accuracy, separable};
    use ndarray::array;

    #[test]
    fn test_svm_rbf() {
        let (x, y) = separable(200, 41);
        let mut svm = SVMClassifier::new(SVMConfig {
            kernel: KernelType::Rbf { gamma: 0.5 },
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();

        assert!(svm.support.as_ref().map_or(0, |s| s.vectors.nrows()) > 0);
        let pred = svm.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.9);

        let proba = svm.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
        // calibrated probabilities should agree with the decision sign most of the time
        let agree = proba
            .iter()
            .zip(pred.iter())
            .filter(|(p, c)| (**p >= 0.5) == (**c > 0.5))
            .count();
        assert!(agree as f64 / pred.len() as f64 > 0.9);
    }

    #[test]
    fn test_predict_follows_probabilities() {
        // overlapping classes so Platt and the raw margin can disagree
        let (mut x, y) = separable(160, 44);
        x.column_mut(0).mapv_inplace(|v| v * 0.3);
        x.column_mut(1).mapv_inplace(|v| v * 0.3);
        let mut svm = SVMClassifier::new(SVMConfig {
            kernel: KernelType::Rbf { gamma: 1.0 },
            c: 0.5,
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();

        let proba = svm.predict_proba(&x).unwrap();
        let pred = svm.predict(&x).unwrap();
        for (p, label) in proba.iter().zip(pred.iter()) {
            assert_eq!(*label, if *p >= 0.5 { 1.0 } else { 0.0 });
        }
    }

    #[test]
    fn test_svm_linear() {
        let x = array![[-2.0, 0.0], [-1.5, 0.5], [-1.0, -0.5], [1.0, 0.3], [1.5, -0.2], [2.0, 0.1]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut svm = SVMClassifier::new(SVMConfig {
            kernel: KernelType::Linear,
            c: 10.0,
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();
        assert_eq!(svm.predict(&x).unwrap(), y);

        let scores = svm.decision_function(&array![[-3.0, 0.0], [3.0, 0.0]]).unwrap();
        assert!(scores[0] < 0.0 && scores[1] > 0.0);
    }

    #[test]
    fn test_kernel_values() {
        let a = array![1.0, 2.0];
        let b = array![1.0, 2.0];
        assert!((KernelType::Rbf { gamma: 1.0 }.compute(a.view(), b.view()) - 1.0).abs() < 1e-12);
        assert!((KernelType::Linear.compute(a.view(), b.view()) - 5.0).abs() < 1e-12);
        let poly = KernelType::Polynomial { degree: 2, gamma: 1.0, coef0: 1.0 };
        assert!((poly.compute(a.view(), b.view()) - 36.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_class_rejected() {
        let mut svm = SVMClassifier::default();
        let err = svm.fit(&array![[0.0], [1.0]], &array![1.0, 1.0]);
        assert!(matches!(err, Err(WineError::TrainingError(_))));
    }

    #[test]
    fn test_not_fitted() {
        let svm = SVMClassifier::default();
        assert!(matches!(svm.decision_function(&array![[0.0]]), Err(WineError::ModelNotFitted)));
    }
}
