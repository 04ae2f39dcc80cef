//! Logistic regression

use super::models::{check_n_features, check_training_data, sigmoid, Classifier};
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// L2-penalized logistic regression fit by full-batch gradient descent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: f64,
    /// Regularization strength (L2, intercept not penalized)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Stop once the gradient norm falls below this
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Iterations run by the last fit
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            n_iter: 0,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.alpha < 0.0 {
            return Err(WineError::InvalidParameter {
                name: "alpha".to_string(),
                value: self.alpha.to_string(),
                reason: "must be non-negative".to_string(),
            });
        }
        if self.learning_rate <= 0.0 {
            return Err(WineError::InvalidParameter {
                name: "learning_rate".to_string(),
                value: self.learning_rate.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Log-odds of the positive class
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(WineError::ModelNotFitted)?;
        check_n_features(x, coefficients.len())?;
        Ok(x.dot(coefficients) + self.intercept)
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.nrows() as f64;
        let mut weights = Array1::zeros(x.ncols());
        let mut bias = 0.0;
        let mut iterations = self.max_iter;

        for iter in 0..self.max_iter {
            let predictions = (x.dot(&weights) + bias).mapv(sigmoid);

            let errors = &predictions - y;
            let dw = x.t().dot(&errors) / n_samples + self.alpha * &weights;
            let db = errors.sum() / n_samples;

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                iterations = iter;
                break;
            }

            weights.scaled_add(-self.learning_rate, &dw);
            bias -= self.learning_rate * db;
        }

        if !bias.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(WineError::TrainingError(
                "logistic regression diverged".to_string(),
            ));
        }

        debug!(iterations, alpha = self.alpha, "logistic regression fitted");
        self.coefficients = Some(weights);
        self.intercept = bias;
        self.n_iter = iterations;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.decision_function(x)?.mapv(sigmoid))
    }

    fn name(&self) -> &str {
        "Logistic Regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::fixtures::{accuracy, separable};
    use ndarray::array;

    #[test]
    fn test_logistic_regression() {
        let (x, y) = separable(200, 1);
        let mut model = LogisticRegression::new()
            .with_max_iter(1000)
            .with_learning_rate(0.5);
        model.fit(&x, &y).unwrap();

        let pred = model.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.9, "accuracy too low");

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_penalty_shrinks_coefficients() {
        let (x, y) = separable(200, 2);
        let mut loose = LogisticRegression::new().with_alpha(0.0);
        let mut tight = LogisticRegression::new().with_alpha(1.0);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let norm = |m: &LogisticRegression| m.coefficients.as_ref().unwrap().mapv(|c| c * c).sum();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_not_fitted() {
        let model = LogisticRegression::new();
        let x = array![[1.0, 2.0]];
        assert!(matches!(model.predict_proba(&x), Err(WineError::ModelNotFitted)));
    }

    #[test]
    fn test_shape_mismatch() {
        let mut model = LogisticRegression::new();
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0];
        assert!(matches!(model.fit(&x, &y), Err(WineError::ShapeError { .. })));
    }
}
