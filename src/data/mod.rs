//! Wine datasets
//!
//! Loading of the red/white wine-quality files and the in-memory dataset the
//! rest of the study works on.

mod loader;

pub use loader::{detect_separator, normalize_column_name, WineLoader, PHYSICOCHEMICAL_FEATURES, QUALITY_COLUMN};

use crate::config::StudyConfig;
use crate::error::{Result, WineError};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Load one wine file for `origin`, guessing the delimiter from its header
pub fn load_wine_csv(path: &Path, origin: Origin) -> Result<WineDataset> {
    WineLoader::new().load_origin(path, origin)
}

/// Load and stack the red and white files using the study's label settings.
/// Each file's delimiter is detected from its own header.
pub fn load_wine_pair(red: &Path, white: &Path, config: &StudyConfig) -> Result<WineDataset> {
    WineLoader::new()
        .with_label_threshold(config.label_threshold)
        .with_include_origin(config.include_origin)
        .load_pair(red, white)
}

/// Default quality score at or above which a wine counts as "good"
pub const DEFAULT_LABEL_THRESHOLD: f64 = 6.0;

/// Name of the numeric origin feature appended after the physicochemical columns
pub const ORIGIN_FEATURE: &str = "is red";

/// Which input file a sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Origin {
    Red,
    White,
}

impl Origin {
    /// Numeric encoding used as a model feature
    pub fn as_feature(self) -> f64 {
        match self {
            Origin::Red => 1.0,
            Origin::White => 0.0,
        }
    }

    pub fn all() -> [Origin; 2] {
        [Origin::Red, Origin::White]
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Red => write!(f, "red"),
            Origin::White => write!(f, "white"),
        }
    }
}

/// Binary label derived from a quality score
pub fn quality_label(quality: f64, threshold: f64) -> f64 {
    if quality >= threshold {
        1.0
    } else {
        0.0
    }
}

/// Tabular wine samples: one row per wine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WineDataset {
    /// Model feature matrix (rows x features)
    pub features: Array2<f64>,
    /// Raw 0-10 quality scores
    pub quality: Array1<f64>,
    /// Derived binary labels
    pub labels: Array1<f64>,
    /// Origin of every row
    pub origins: Vec<Origin>,
    /// Column names of `features`
    pub feature_names: Vec<String>,
    /// Threshold used to derive `labels`
    pub label_threshold: f64,
}

impl WineDataset {
    /// Build a dataset, deriving labels from quality scores
    pub fn new(
        features: Array2<f64>,
        quality: Array1<f64>,
        origins: Vec<Origin>,
        feature_names: Vec<String>,
        label_threshold: f64,
    ) -> Result<Self> {
        let n = features.nrows();
        if quality.len() != n || origins.len() != n {
            return Err(WineError::ShapeError {
                expected: format!("{} rows in quality and origins", n),
                actual: format!("{} quality, {} origins", quality.len(), origins.len()),
            });
        }
        if feature_names.len() != features.ncols() {
            return Err(WineError::ShapeError {
                expected: format!("{} feature names", features.ncols()),
                actual: format!("{} feature names", feature_names.len()),
            });
        }

        let labels = quality.mapv(|q| quality_label(q, label_threshold));

        Ok(Self {
            features,
            quality,
            labels,
            origins,
            feature_names,
            label_threshold,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_samples() == 0
    }

    /// Row subset in the given order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            features: self.features.select(Axis(0), indices),
            quality: self.quality.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
            origins: indices.iter().map(|&i| self.origins[i]).collect(),
            feature_names: self.feature_names.clone(),
            label_threshold: self.label_threshold,
        }
    }

    /// Rows coming from one input file
    pub fn filter_origin(&self, origin: Origin) -> Self {
        let indices: Vec<usize> = self
            .origins
            .iter()
            .enumerate()
            .filter(|(_, o)| **o == origin)
            .map(|(i, _)| i)
            .collect();
        self.select(&indices)
    }

    /// (negatives, positives)
    pub fn class_balance(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&y| y > 0.5).count();
        (self.labels.len() - positives, positives)
    }

    /// Append another dataset's rows. Feature layouts must match.
    pub fn concat(&self, other: &WineDataset) -> Result<Self> {
        if self.feature_names != other.feature_names {
            return Err(WineError::DataError(
                "cannot concatenate datasets with different feature columns".to_string(),
            ));
        }

        let features = ndarray::concatenate(Axis(0), &[self.features.view(), other.features.view()])?;
        let quality = ndarray::concatenate(Axis(0), &[self.quality.view(), other.quality.view()])?;
        let mut origins = self.origins.clone();
        origins.extend_from_slice(&other.origins);

        Self::new(features, quality, origins, self.feature_names.clone(), self.label_threshold)
    }

    /// Append the origin flag as a trailing numeric feature
    pub fn with_origin_feature(&self) -> Result<Self> {
        if self.feature_names.iter().any(|n| n == ORIGIN_FEATURE) {
            return Ok(self.clone());
        }

        let flag = Array1::from_iter(self.origins.iter().map(|o| o.as_feature()));
        let features = ndarray::concatenate(
            Axis(1),
            &[self.features.view(), flag.view().insert_axis(Axis(1))],
        )?;
        let mut feature_names = self.feature_names.clone();
        feature_names.push(ORIGIN_FEATURE.to_string());

        Self::new(features, self.quality.clone(), self.origins.clone(), feature_names, self.label_threshold)
    }

    /// Re-derive labels with a different threshold
    pub fn relabel(&mut self, threshold: f64) {
        self.label_threshold = threshold;
        self.labels = self.quality.mapv(|q| quality_label(q, threshold));
    }
}
