//! Neural Network (Multi-Layer Perceptron) implementation
//!
//! A feedforward network with a single sigmoid output unit, trained on binary
//! cross-entropy with mini-batch SGD and momentum.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{check_n_features, check_training_data, sigmoid, Classifier};
use crate::error::{Result, WineError};

/// Hidden layer activation function
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Rectified Linear Unit
    #[default]
    ReLU,
    /// Sigmoid
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
}

impl Activation {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "relu" => Some(Self::ReLU),
            "sigmoid" | "logistic" => Some(Self::Sigmoid),
            "tanh" => Some(Self::Tanh),
            _ => None,
        }
    }

    fn apply(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| v.max(0.0)),
            Activation::Sigmoid => z.mapv(sigmoid),
            Activation::Tanh => z.mapv(f64::tanh),
        }
    }

    fn derivative(self, z: &Array2<f64>) -> Array2<f64> {
        match self {
            Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Sigmoid => z.mapv(|v| {
                let s = sigmoid(v);
                s * (1.0 - s)
            }),
            Activation::Tanh => z.mapv(|v| 1.0 - v.tanh().powi(2)),
        }
    }
}

/// Neural Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPConfig {
    /// Hidden layer sizes
    pub hidden_layers: Vec<usize>,
    /// Activation function for hidden layers
    pub activation: Activation,
    /// Learning rate
    pub learning_rate: f64,
    /// Number of epochs
    pub max_epochs: usize,
    /// Batch size
    pub batch_size: usize,
    /// L2 regularization
    pub alpha: f64,
    /// Random seed
    pub random_state: u64,
    /// Hold out a validation share and stop when its loss stalls
    pub early_stopping: bool,
    /// Early stopping patience
    pub early_stopping_patience: usize,
    /// Validation split for early stopping
    pub validation_split: f64,
    /// Momentum
    pub momentum: f64,
}

impl Default for MLPConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![25],
            activation: Activation::ReLU,
            learning_rate: 0.01,
            max_epochs: 100,
            batch_size: 32,
            alpha: 0.0001,
            random_state: 42,
            early_stopping: true,
            early_stopping_patience: 10,
            validation_split: 0.1,
            momentum: 0.9,
        }
    }
}

/// Multi-Layer Perceptron Classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MLPClassifier {
    config: MLPConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    /// Epochs actually run by the last fit
    n_epochs: usize,
}

impl Default for MLPClassifier {
    fn default() -> Self {
        Self::new(MLPConfig::default())
    }
}

impl MLPClassifier {
    pub fn new(config: MLPConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            n_epochs: 0,
        }
    }

    pub fn config(&self) -> &MLPConfig {
        &self.config
    }

    pub fn n_epochs(&self) -> usize {
        self.n_epochs
    }

    fn validate(&self) -> Result<()> {
        if self.config.hidden_layers.iter().any(|&h| h == 0) {
            return Err(WineError::InvalidParameter {
                name: "hidden_layers".to_string(),
                value: format!("{:?}", self.config.hidden_layers),
                reason: "layer sizes must be positive".to_string(),
            });
        }
        if self.config.batch_size == 0 {
            return Err(WineError::InvalidParameter {
                name: "batch_size".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.config.validation_split) {
            return Err(WineError::InvalidParameter {
                name: "validation_split".to_string(),
                value: self.config.validation_split.to_string(),
                reason: "must be in [0, 1)".to_string(),
            });
        }
        Ok(())
    }

    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(1);

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            // Xavier/Glorot initialization
            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            self.weights
                .push(Array2::from_shape_fn((n_in, n_out), |_| rng.gen::<f64>() * 2.0 * scale - scale));
            self.biases.push(Array1::zeros(n_out));
        }
    }

    /// Activations per layer (input first) and pre-activations per layer
    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::with_capacity(self.weights.len());
        let last = self.weights.len() - 1;

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations[i].dot(w) + b;
            let a = if i < last {
                self.config.activation.apply(&z)
            } else {
                z.mapv(sigmoid)
            };
            z_values.push(z);
            activations.push(a);
        }

        (activations, z_values)
    }

    fn backward(
        &self,
        y: &Array1<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y.len() as f64;
        let mut gradients = Vec::with_capacity(self.weights.len());

        // Cross-entropy gradient through the sigmoid output
        let y_2d = y.view().insert_axis(Axis(1));
        let mut delta = (&activations[activations.len() - 1] - &y_2d) / n;

        for i in (0..self.weights.len()).rev() {
            let grad_w = activations[i].t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                delta = delta.dot(&self.weights[i].t()) * self.config.activation.derivative(&z_values[i - 1]);
            }
        }

        gradients.reverse();
        gradients
    }

    fn output(&self, x: &Array2<f64>) -> Array1<f64> {
        let (mut activations, _) = self.forward(x);
        activations
            .pop()
            .map(|a| a.column(0).to_owned())
            .unwrap_or_else(|| Array1::zeros(x.nrows()))
    }

    fn bce(y: &Array1<f64>, p: &Array1<f64>) -> f64 {
        let total: f64 = y
            .iter()
            .zip(p.iter())
            .map(|(&t, &q)| {
                let q = q.clamp(1e-15, 1.0 - 1e-15);
                -(t * q.ln() + (1.0 - t) * (1.0 - q).ln())
            })
            .sum();
        total / y.len().max(1) as f64
    }
}

impl Classifier for MLPClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.validate()?;

        let n_samples = x.nrows();
        self.n_features = x.ncols();

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.config.random_state);
        self.initialize_weights(&mut rng);

        // Random validation holdout for early stopping
        let mut order: Vec<usize> = (0..n_samples).collect();
        order.shuffle(&mut rng);
        let val_size = if self.config.early_stopping {
            ((n_samples as f64 * self.config.validation_split) as usize).min(n_samples - 1)
        } else {
            0
        };
        let (val_idx, train_idx) = order.split_at(val_size);
        let x_train = x.select(Axis(0), train_idx);
        let y_train = y.select(Axis(0), train_idx);
        let x_val = x.select(Axis(0), val_idx);
        let y_val = y.select(Axis(0), val_idx);
        let train_size = train_idx.len();

        let mut velocities_w: Vec<Array2<f64>> = self.weights.iter().map(|w| Array2::zeros(w.raw_dim())).collect();
        let mut velocities_b: Vec<Array1<f64>> = self.biases.iter().map(|b| Array1::zeros(b.len())).collect();

        let lr = self.config.learning_rate;
        let decay = 1.0 - self.config.alpha * lr;
        let mut best_val_loss = f64::INFINITY;
        let mut best_params: Option<(Vec<Array2<f64>>, Vec<Array1<f64>>)> = None;
        let mut patience_counter = 0;
        let mut indices: Vec<usize> = (0..train_size).collect();
        self.n_epochs = 0;

        for _epoch in 0..self.config.max_epochs {
            self.n_epochs += 1;
            indices.shuffle(&mut rng);

            for batch_indices in indices.chunks(self.config.batch_size) {
                let x_batch = x_train.select(Axis(0), batch_indices);
                let y_batch = y_train.select(Axis(0), batch_indices);

                let (activations, z_values) = self.forward(&x_batch);
                let gradients = self.backward(&y_batch, &activations, &z_values);

                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum - &grad_w * lr;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum - &grad_b * lr;

                    self.weights[i] += &velocities_w[i];
                    self.biases[i] += &velocities_b[i];

                    // L2 regularization
                    self.weights[i] *= decay;
                }
            }

            if self.weights.iter().any(|w| w.iter().any(|v| !v.is_finite())) {
                return Err(WineError::TrainingError("neural network diverged".to_string()));
            }

            if val_size > 0 {
                let val_loss = Self::bce(&y_val, &self.output(&x_val));
                if val_loss < best_val_loss {
                    best_val_loss = val_loss;
                    best_params = Some((self.weights.clone(), self.biases.clone()));
                    patience_counter = 0;
                } else {
                    patience_counter += 1;
                    if patience_counter >= self.config.early_stopping_patience {
                        break;
                    }
                }
            }
        }

        if let Some((weights, biases)) = best_params {
            self.weights = weights;
            self.biases = biases;
        }

        debug!(
            epochs = self.n_epochs,
            hidden = ?self.config.hidden_layers,
            val_loss = best_val_loss,
            "neural network fitted"
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.weights.is_empty() {
            return Err(WineError::ModelNotFitted);
        }
        check_n_features(x, self.n_features)?;
        Ok(self.output(x))
    }

    fn name(&self) -> &str {
        "Neural Network"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::models::fixtures::{accuracy, separable};
    use ndarray::array;

    #[test]
    fn test_mlp_classifier() {
        let (x, y) = separable(200, 31);
        let mut mlp = MLPClassifier::new(MLPConfig {
            hidden_layers: vec![8],
            max_epochs: 60,
            ..Default::default()
        });
        mlp.fit(&x, &y).unwrap();

        let pred = mlp.predict(&x).unwrap();
        assert!(accuracy(&y, &pred) > 0.9, "accuracy {}", accuracy(&y, &pred));

        let proba = mlp.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_activation_functions() {
        let z = array![[-1.0, 0.0, 2.0]];
        assert_eq!(Activation::ReLU.apply(&z), array![[0.0, 0.0, 2.0]]);
        assert!((Activation::Sigmoid.apply(&z)[[0, 1]] - 0.5).abs() < 1e-12);
        assert!((Activation::Tanh.derivative(&z)[[0, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tanh_two_layers() {
        let (x, y) = separable(200, 32);
        let mut mlp = MLPClassifier::new(MLPConfig {
            hidden_layers: vec![6, 4],
            activation: Activation::Tanh,
            max_epochs: 60,
            early_stopping: false,
            ..Default::default()
        });
        mlp.fit(&x, &y).unwrap();
        assert_eq!(mlp.n_epochs(), 60);
        assert!(accuracy(&y, &mlp.predict(&x).unwrap()) > 0.85);
    }

    #[test]
    fn test_deterministic() {
        let (x, y) = separable(80, 33);
        let fit = || {
            let mut mlp = MLPClassifier::new(MLPConfig {
                max_epochs: 10,
                ..Default::default()
            });
            mlp.fit(&x, &y).unwrap();
            mlp.predict_proba(&x).unwrap()
        };
        assert_eq!(fit(), fit());
    }

    #[test]
    fn test_not_fitted() {
        let mlp = MLPClassifier::default();
        assert!(matches!(mlp.predict_proba(&array![[1.0]]), Err(WineError::ModelNotFitted)));
    }
}
