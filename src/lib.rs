//! Sonar Detect - SONAR rock-vs-mine classification
//!
//! This crate trains binary classifiers on 60-band SONAR frequency readings,
//! compares them, and serves predictions from the best model:
//! - [`utils`] - Dataset loading and summaries
//! - [`preprocessing`] - Feature scaling
//! - [`training`] - Classifier implementations, cross-validation, model selection
//! - [`artifact`] - Serialized model bundles with ranked risk factors
//! - [`assessment`] - Confidence/risk interpretation of predictions
//! - [`inference`] - Read-only prediction engine with backup-model fallback
//! - [`server`] - HTTP form and JSON API
//! - [`cli`] - Command-line interface

pub mod error;

pub mod utils;
pub mod preprocessing;
pub mod training;
pub mod artifact;
pub mod assessment;
pub mod inference;

pub mod server;
pub mod cli;

pub use error::{Result, SonarError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Result, SonarError};
    pub use crate::preprocessing::{Scaler, ScalerKind};
    pub use crate::training::{
        ClassificationMetrics, CrossValidator, CvResults, ModelComparison, ModelType,
        TrainEngine, TrainingConfig,
    };
    pub use crate::artifact::{ModelArtifact, RiskFactor};
    pub use crate::assessment::{Assessment, ConfidenceLevel, ObjectClass, RiskLevel, BAND_COUNT};
    pub use crate::inference::{InferenceEngine, PredictionReport};
}
