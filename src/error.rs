//! Error types for the wine quality study

use thiserror::Error;

/// Result type alias for study operations
pub type Result<T> = std::result::Result<T, WineError>;

/// Main error type for the study
#[derive(Error, Debug)]
pub enum WineError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Plot error: {0}")]
    PlotError(String),
}

impl WineError {
    /// Shorthand for a length mismatch between a feature matrix and its labels
    pub(crate) fn length_mismatch(expected: usize, actual: usize) -> Self {
        WineError::ShapeError {
            expected: format!("y length = {}", expected),
            actual: format!("y length = {}", actual),
        }
    }
}

impl From<polars::error::PolarsError> for WineError {
    fn from(err: polars::error::PolarsError) -> Self {
        WineError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for WineError {
    fn from(err: serde_json::Error) -> Self {
        WineError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for WineError {
    fn from(err: ndarray::ShapeError) -> Self {
        WineError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
