//! Inference module
//!
//! Read-only prediction over loaded model artifacts.

mod engine;

pub use engine::{InferenceEngine, PredictionReport};
