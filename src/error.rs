//! Error types for the sonar-detect crate

use thiserror::Error;

/// Result type alias for sonar-detect operations
pub type Result<T> = std::result::Result<T, SonarError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum SonarError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Preprocessing error: {0}")]
    PreprocessingError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Inference error: {0}")]
    InferenceError(String),

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

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for SonarError {
    fn from(err: polars::error::PolarsError) -> Self {
        SonarError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SonarError {
    fn from(err: serde_json::Error) -> Self {
        SonarError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SonarError {
    fn from(err: ndarray::ShapeError) -> Self {
        SonarError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
