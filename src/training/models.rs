//! Classifier trait and shared input checks

use crate::error::{Result, WineError};
use ndarray::{Array1, Array2};

/// Binary classifier over dense `f64` features with labels in {0, 1}
pub trait Classifier {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class for every row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Hard 0/1 predictions at threshold 0.5
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self.predict_proba(x)?.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Short display name
    fn name(&self) -> &str;

    /// Normalized feature importances (if available)
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        (**self).fit(x, y)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        (**self).predict_proba(x)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        (**self).predict(x)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        (**self).feature_importances()
    }
}

/// Validate a training set: matching lengths, at least one row, 0/1 labels
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(WineError::length_mismatch(x.nrows(), y.len()));
    }
    if x.nrows() == 0 {
        return Err(WineError::TrainingError("empty training set".to_string()));
    }
    if y.iter().any(|&v| v != 0.0 && v != 1.0) {
        return Err(WineError::TrainingError(
            "labels must be 0 or 1".to_string(),
        ));
    }
    Ok(())
}

/// Validate the column count of a prediction matrix
pub(crate) fn check_n_features(x: &Array2<f64>, expected: usize) -> Result<()> {
    if x.ncols() != expected {
        return Err(WineError::ShapeError {
            expected: format!("{} features", expected),
            actual: format!("{} features", x.ncols()),
        });
    }
    Ok(())
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Scale a vector to sum to one; all-zero input is returned unchanged
pub(crate) fn normalize(mut v: Array1<f64>) -> Array1<f64> {
    let total = v.sum();
    if total > 0.0 {
        v /= total;
    }
    v
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ndarray::{Array1, Array2};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Two Gaussian-ish blobs separated along `x0 + x1`
    pub fn separable(n: usize, seed: u64) -> (Array2<f64>, Array1<f64>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 3));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let label = (i % 2) as f64;
            let shift = if label > 0.5 { 1.5 } else { -1.5 };
            x[[i, 0]] = shift + rng.gen_range(-1.0..1.0);
            x[[i, 1]] = shift + rng.gen_range(-1.0..1.0);
            x[[i, 2]] = rng.gen_range(-1.0..1.0);
            y[i] = label;
        }
        (x, y)
    }

    pub fn accuracy(y: &Array1<f64>, pred: &Array1<f64>) -> f64 {
        let correct = y.iter().zip(pred.iter()).filter(|(a, b)| (*a - *b).abs() < 0.5).count();
        correct as f64 / y.len() as f64
    }
}
