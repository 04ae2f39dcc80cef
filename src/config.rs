//! Study configuration

use crate::comparison::ModelKind;
use crate::data::DEFAULT_LABEL_THRESHOLD;
use crate::error::{Result, WineError};
use crate::preprocessing::ScalerType;
use crate::tuning::{ParameterGrid, Scoring};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable holding the default red wine file
pub const RED_PATH_ENV: &str = "WINEQ_RED";
/// Environment variable holding the default white wine file
pub const WHITE_PATH_ENV: &str = "WINEQ_WHITE";

/// Configuration for a full comparison run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Red wine file
    pub red_path: Option<PathBuf>,
    /// White wine file
    pub white_path: Option<PathBuf>,
    /// Quality score at or above which a wine is labelled good
    pub label_threshold: f64,
    /// Append the red/white flag as a feature
    pub include_origin: bool,
    /// Fraction of rows held out for testing
    pub test_size: f64,
    /// Folds used by the grid search
    pub cv_folds: usize,
    /// Seed for splits, folds and every model
    pub seed: u64,
    /// Metric maximized by the grid search
    pub scoring: Scoring,
    /// Feature scaling, fit on the training split
    pub scaler: ScalerType,
    /// Models to compare, in order
    pub models: Vec<ModelKind>,
    /// Grids replacing the defaults
    pub grids: BTreeMap<ModelKind, ParameterGrid>,
    /// Row caps for tuning; models without an entry use their default
    pub max_samples: BTreeMap<ModelKind, usize>,
    /// Directory receiving the report files
    pub output_dir: PathBuf,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            red_path: None,
            white_path: None,
            label_threshold: DEFAULT_LABEL_THRESHOLD,
            include_origin: true,
            test_size: 0.2,
            cv_folds: 5,
            seed: 42,
            scoring: Scoring::RocAuc,
            scaler: ScalerType::Standard,
            models: ModelKind::all().to_vec(),
            grids: BTreeMap::new(),
            max_samples: BTreeMap::new(),
            output_dir: PathBuf::from("wine_report"),
        }
    }
}

impl StudyConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(mut self, red: impl Into<PathBuf>, white: impl Into<PathBuf>) -> Self {
        self.red_path = Some(red.into());
        self.white_path = Some(white.into());
        self
    }

    pub fn with_label_threshold(mut self, threshold: f64) -> Self {
        self.label_threshold = threshold;
        self
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn with_models(mut self, models: Vec<ModelKind>) -> Self {
        self.models = models;
        self
    }

    /// Replace the default grid of one model
    pub fn with_grid(mut self, kind: ModelKind, grid: ParameterGrid) -> Self {
        self.grids.insert(kind, grid);
        self
    }

    pub fn with_max_samples(mut self, kind: ModelKind, max_samples: usize) -> Self {
        self.max_samples.insert(kind, max_samples);
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Grid searched for `kind`
    pub fn grid_for(&self, kind: ModelKind) -> ParameterGrid {
        self.grids.get(&kind).cloned().unwrap_or_else(|| kind.default_grid())
    }

    /// Row cap used while tuning `kind`
    pub fn max_samples_for(&self, kind: ModelKind) -> Option<usize> {
        self.max_samples
            .get(&kind)
            .copied()
            .or_else(|| kind.default_max_samples())
    }

    /// Fill missing data paths from `WINEQ_RED` / `WINEQ_WHITE`
    pub fn apply_env(mut self) -> Self {
        if self.red_path.is_none() {
            self.red_path = std::env::var_os(RED_PATH_ENV).map(PathBuf::from);
        }
        if self.white_path.is_none() {
            self.white_path = std::env::var_os(WHITE_PATH_ENV).map(PathBuf::from);
        }
        self
    }

    /// Both data paths, or an error naming the missing one
    pub fn data_paths(&self) -> Result<(&Path, &Path)> {
        let red = self.red_path.as_deref().ok_or_else(|| {
            WineError::ConfigError(format!("no red wine file given (use --red or {})", RED_PATH_ENV))
        })?;
        let white = self.white_path.as_deref().ok_or_else(|| {
            WineError::ConfigError(format!("no white wine file given (use --white or {})", WHITE_PATH_ENV))
        })?;
        Ok((red, white))
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(WineError::InvalidParameter {
                name: "test_size".to_string(),
                value: self.test_size.to_string(),
                reason: "must be in (0, 1)".to_string(),
            });
        }
        if self.cv_folds < 2 {
            return Err(WineError::InvalidParameter {
                name: "cv_folds".to_string(),
                value: self.cv_folds.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if !(0.0..=10.0).contains(&self.label_threshold) {
            return Err(WineError::InvalidParameter {
                name: "label_threshold".to_string(),
                value: self.label_threshold.to_string(),
                reason: "quality scores lie in [0, 10]".to_string(),
            });
        }
        if self.models.is_empty() {
            return Err(WineError::ConfigError("no models selected".to_string()));
        }
        for (kind, grid) in &self.grids {
            grid.validate()
                .map_err(|e| WineError::ConfigError(format!("{}: {}", kind.key(), e)))?;
        }
        if let Some((kind, _)) = self.max_samples.iter().find(|(_, &n)| n < self.cv_folds) {
            return Err(WineError::ConfigError(format!(
                "max_samples for {} is below the number of folds",
                kind.key()
            )));
        }
        Ok(())
    }

    /// Save the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a configuration; absent fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
