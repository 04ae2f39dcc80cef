//! Platt scaling (sigmoid calibration)

use super::models::sigmoid;
use crate::error::{Result, WineError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Maps raw decision values to probabilities with a fitted sigmoid
///
/// `P(y=1|f) = 1 / (1 + exp(-(a*f + b)))`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlattScaling {
    /// Slope parameter A
    a: Option<f64>,
    /// Intercept parameter B
    b: Option<f64>,
    /// Maximum Newton iterations
    max_iter: usize,
    /// Convergence tolerance
    tol: f64,
}

impl PlattScaling {
    /// Create new Platt scaling calibrator
    pub fn new() -> Self {
        Self {
            a: None,
            b: None,
            max_iter: 100,
            tol: 1e-10,
        }
    }

    /// Get fitted parameters
    pub fn parameters(&self) -> Option<(f64, f64)> {
        self.a.zip(self.b)
    }

    /// Regularized negative log-likelihood of the current fit
    fn objective(scores: &Array1<f64>, targets: &[f64], a: f64, b: f64) -> f64 {
        scores
            .iter()
            .zip(targets.iter())
            .map(|(&f, &t)| {
                let p = sigmoid(a * f + b).clamp(1e-15, 1.0 - 1e-15);
                -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
            })
            .sum()
    }

    /// Fit on decision values and 0/1 labels
    pub fn fit(&mut self, scores: &Array1<f64>, labels: &Array1<f64>) -> Result<()> {
        let n = scores.len();
        if n != labels.len() {
            return Err(WineError::length_mismatch(n, labels.len()));
        }
        if n == 0 {
            return Err(WineError::ValidationError("Empty input".to_string()));
        }

        // Platt's smoothed targets
        let n_pos = labels.iter().filter(|&&y| y > 0.5).count() as f64;
        let n_neg = n as f64 - n_pos;
        let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
        let target_neg = 1.0 / (n_neg + 2.0);
        let targets: Vec<f64> = labels
            .iter()
            .map(|&y| if y > 0.5 { target_pos } else { target_neg })
            .collect();

        let mut a = 1.0;
        let mut b = ((n_pos + 1.0) / (n_neg + 1.0)).ln();
        let mut current = Self::objective(scores, &targets, a, b);

        for _ in 0..self.max_iter {
            let mut grad_a = 0.0;
            let mut grad_b = 0.0;
            let mut hess_aa = 1e-12;
            let mut hess_ab = 0.0;
            let mut hess_bb = 1e-12;

            for (&f, &t) in scores.iter().zip(targets.iter()) {
                let p = sigmoid(a * f + b);
                let d1 = p - t;
                let d2 = p * (1.0 - p);
                grad_a += f * d1;
                grad_b += d1;
                hess_aa += f * f * d2;
                hess_ab += f * d2;
                hess_bb += d2;
            }

            if grad_a.abs() < 1e-5 && grad_b.abs() < 1e-5 {
                break;
            }

            let det = hess_aa * hess_bb - hess_ab * hess_ab;
            if det.abs() < 1e-300 {
                break;
            }
            let delta_a = (hess_bb * grad_a - hess_ab * grad_b) / det;
            let delta_b = (hess_aa * grad_b - hess_ab * grad_a) / det;

            // Backtracking line search on the Newton direction
            let mut step = 1.0;
            let mut accepted = false;
            while step >= 1e-10 {
                let new_a = a - step * delta_a;
                let new_b = b - step * delta_b;
                let value = Self::objective(scores, &targets, new_a, new_b);
                if value < current + 1e-4 * step * (grad_a * -delta_a + grad_b * -delta_b) {
                    a = new_a;
                    b = new_b;
                    current = value;
                    accepted = true;
                    break;
                }
                step /= 2.0;
            }

            if !accepted || (step * delta_a).abs() < self.tol && (step * delta_b).abs() < self.tol {
                break;
            }
        }

        self.a = Some(a);
        self.b = Some(b);
        Ok(())
    }

    /// Probabilities for raw decision values
    pub fn transform(&self, scores: &Array1<f64>) -> Result<Array1<f64>> {
        let (a, b) = self.parameters().ok_or(WineError::ModelNotFitted)?;
        Ok(scores.mapv(|f| sigmoid(a * f + b)))
    }
}

impl Default for PlattScaling {
    fn default() -> Self {
        Self::new()
    }
}
