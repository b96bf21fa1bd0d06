//! Inference engine implementation
//!
//! Loads model artifacts once at startup and then serves predictions without
//! any mutable state, so a single engine can be shared across request
//! handlers behind an `Arc`.

use crate::artifact::{ModelArtifact, RiskFactor};
use crate::assessment::{validate_bands, Assessment, BAND_COUNT};
use crate::error::{Result, SonarError};
use ndarray::Array2;
use serde::Serialize;
use std::path::Path;
use tracing::warn;

/// Full prediction output for one 60-band reading
#[derive(Debug, Clone, Serialize)]
pub struct PredictionReport {
    /// Name of the model that produced the prediction
    pub model_name: String,
    /// Whether the backup model had to stand in for the primary
    pub used_backup: bool,
    #[serde(flatten)]
    pub assessment: Assessment,
}

/// Prediction engine over a primary artifact with an optional backup
pub struct InferenceEngine {
    primary: ModelArtifact,
    backup: Option<ModelArtifact>,
}

impl InferenceEngine {
    /// Load the primary artifact, and the backup when given
    pub fn load(primary_path: &Path, backup_path: Option<&Path>) -> Result<Self> {
        let primary = ModelArtifact::load(primary_path)?;

        let backup = match backup_path {
            Some(path) => Some(ModelArtifact::load(path)?),
            None => None,
        };

        Ok(Self { primary, backup })
    }

    /// Build from already-loaded artifacts
    pub fn from_artifacts(primary: ModelArtifact, backup: Option<ModelArtifact>) -> Self {
        Self { primary, backup }
    }

    /// Name of the primary model
    pub fn model_name(&self) -> &str {
        &self.primary.name
    }

    /// Whether a backup model is available
    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }

    /// Ranked discriminative bands from the primary artifact (falls back to
    /// the backup's when the primary family has none)
    pub fn risk_factors(&self) -> &[RiskFactor] {
        if !self.primary.risk_factors.is_empty() {
            return &self.primary.risk_factors;
        }
        self.backup
            .as_ref()
            .map(|b| b.risk_factors.as_slice())
            .unwrap_or(&[])
    }

    /// Predict one reading: validate, classify, and interpret.
    ///
    /// If the primary model errors and a backup is loaded, the backup answers
    /// instead and the report is marked accordingly.
    pub fn predict(&self, bands: &[f64]) -> Result<PredictionReport> {
        validate_bands(bands)?;

        let x = Array2::from_shape_vec((1, BAND_COUNT), bands.to_vec())
            .map_err(|e| SonarError::InferenceError(e.to_string()))?;

        match self.primary.engine.predict_proba_array(&x) {
            Ok(proba) => Ok(self.report(&self.primary, proba[[0, 0]], proba[[0, 1]], false)),
            Err(primary_err) => {
                let backup = self.backup.as_ref().ok_or_else(|| {
                    SonarError::InferenceError(format!(
                        "Primary model failed and no backup is loaded: {}",
                        primary_err
                    ))
                })?;

                warn!(
                    model = %self.primary.name,
                    error = %primary_err,
                    "Primary model failed, answering with backup"
                );

                let proba = backup.engine.predict_proba_array(&x)?;
                Ok(self.report(backup, proba[[0, 0]], proba[[0, 1]], true))
            }
        }
    }

    fn report(
        &self,
        artifact: &ModelArtifact,
        rock_probability: f64,
        mine_probability: f64,
        used_backup: bool,
    ) -> PredictionReport {
        PredictionReport {
            model_name: artifact.name.clone(),
            used_backup,
            assessment: Assessment::from_probabilities(rock_probability, mine_probability),
        }
    }
}
