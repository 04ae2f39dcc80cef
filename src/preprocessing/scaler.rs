//! Feature scaling implementations

use crate::error::{Result, WineError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalerType {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// No scaling
    None,
}

impl Default for ScalerType {
    fn default() -> Self {
        ScalerType::Standard
    }
}

/// Column-wise feature scaler. Fit on training rows only, then applied to any split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    scaler_type: ScalerType,
    /// mean or min per column
    center: Option<Array1<f64>>,
    /// std or range per column
    scale: Option<Array1<f64>>,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(scaler_type: ScalerType) -> Self {
        Self {
            scaler_type,
            center: None,
            scale: None,
        }
    }

    /// Standard scaler shorthand
    pub fn standard() -> Self {
        Self::new(ScalerType::Standard)
    }

    pub fn scaler_type(&self) -> ScalerType {
        self.scaler_type
    }

    pub fn is_fitted(&self) -> bool {
        self.center.is_some()
    }

    /// Fit the scaler to a feature matrix
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(WineError::PreprocessingError(
                "cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n_cols = x.ncols();
        let (center, scale) = match self.scaler_type {
            ScalerType::Standard => {
                let mean = x
                    .mean_axis(Axis(0))
                    .ok_or_else(|| WineError::PreprocessingError("empty matrix".to_string()))?;
                // Sample std (ddof = 1); a single row has no spread
                let ddof = if x.nrows() > 1 { 1.0 } else { 0.0 };
                let std = x.std_axis(Axis(0), ddof);
                (mean, std)
            }
            ScalerType::MinMax => {
                let min = x.fold_axis(Axis(0), f64::INFINITY, |a, &b| a.min(b));
                let max = x.fold_axis(Axis(0), f64::NEG_INFINITY, |a, &b| a.max(b));
                let range = &max - &min;
                (min, range)
            }
            ScalerType::None => (Array1::zeros(n_cols), Array1::ones(n_cols)),
        };

        // Constant columns pass through centered but unscaled
        let scale = scale.mapv(|s| if s.abs() < 1e-12 || !s.is_finite() { 1.0 } else { s });

        self.center = Some(center);
        self.scale = Some(scale);
        Ok(self)
    }

    /// Transform a feature matrix with the fitted parameters
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (center, scale) = match (&self.center, &self.scale) {
            (Some(c), Some(s)) => (c, s),
            _ => return Err(WineError::ModelNotFitted),
        };

        if x.ncols() != center.len() {
            return Err(WineError::ShapeError {
                expected: format!("{} columns", center.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        Ok((x - &center.view().insert_axis(Axis(0))) / &scale.view().insert_axis(Axis(0)))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Undo the scaling
    pub fn inverse_transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (center, scale) = match (&self.center, &self.scale) {
            (Some(c), Some(s)) => (c, s),
            _ => return Err(WineError::ModelNotFitted),
        };

        Ok(x * &scale.view().insert_axis(Axis(0)) + &center.view().insert_axis(Axis(0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0]];
        let mut scaler = Scaler::standard();
        let scaled = scaler.fit_transform(&x).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        assert!(mean.iter().all(|m| m.abs() < 1e-12));
        // Sample std of [1,2,3] is 1, so values become -1, 0, 1
        assert!((scaled[[0, 0]] + 1.0).abs() < 1e-12);
        assert!((scaled[[2, 1]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_minmax_scaler() {
        let x = array![[1.0], [3.0], [5.0]];
        let mut scaler = Scaler::new(ScalerType::MinMax);
        let scaled = scaler.fit_transform(&x).unwrap();
        assert_eq!(scaled.column(0).to_vec(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_constant_column_not_divided_by_zero() {
        let x = array![[4.0, 1.0], [4.0, 2.0]];
        let mut scaler = Scaler::standard();
        let scaled = scaler.fit_transform(&x).unwrap();
        assert!(scaled.iter().all(|v| v.is_finite()));
        assert_eq!(scaled[[0, 0]], 0.0);
    }

    #[test]
    fn test_transform_uses_training_statistics() {
        let train = array![[0.0], [2.0]];
        let test = array![[4.0]];
        let mut scaler = Scaler::standard();
        scaler.fit(&train).unwrap();
        let scaled = scaler.transform(&test).unwrap();
        // mean 1, sample std sqrt(2)
        assert!((scaled[[0, 0]] - 3.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_roundtrip() {
        let x = array![[1.5, -2.0], [0.5, 4.0], [3.0, 1.0]];
        let mut scaler = Scaler::standard();
        let scaled = scaler.fit_transform(&x).unwrap();
        let restored = scaler.inverse_transform(&scaled).unwrap();
        for (a, b) in x.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_transform_before_fit() {
        let scaler = Scaler::standard();
        assert!(matches!(scaler.transform(&array![[1.0]]), Err(WineError::ModelNotFitted)));
    }

    #[test]
    fn test_column_mismatch() {
        let mut scaler = Scaler::standard();
        scaler.fit(&array![[1.0, 2.0], [2.0, 3.0]]).unwrap();
        assert!(matches!(
            scaler.transform(&array![[1.0]]),
            Err(WineError::ShapeError { .. })
        ));
    }
}
