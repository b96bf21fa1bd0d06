//! Serialized model bundles
//!
//! One JSON artifact carries everything the serving half needs: the fitted
//! scale->classifier engine, the band layout, and the ranked list of the most
//! discriminative frequency bands.

use crate::assessment::BAND_COUNT;
use crate::error::{Result, SonarError};
use crate::training::TrainEngine;
use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of ranked bands stored in an artifact
const TOP_RISK_FACTORS: usize = 10;

/// One ranked discriminative frequency band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskFactor {
    /// 1-based rank
    pub rank: usize,
    /// Frequency band index (0-59)
    pub frequency_band: usize,
    /// Raw importance score from the model
    pub importance: f64,
    /// Importance as a percentage of the top band's importance
    pub percentage: f64,
}

impl RiskFactor {
    /// Rank band importances, keeping the top entries. Importances are
    /// normalized against the maximum so the top band reads 100%.
    pub fn ranked(importances: &Array1<f64>) -> Vec<RiskFactor> {
        let mut indexed: Vec<(usize, f64)> = importances
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| v.is_finite() && *v > 0.0)
            .collect();
        indexed.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        indexed.truncate(TOP_RISK_FACTORS);

        let max = indexed.first().map(|(_, v)| *v).unwrap_or(1.0);

        indexed
            .into_iter()
            .enumerate()
            .map(|(i, (band, importance))| RiskFactor {
                rank: i + 1,
                frequency_band: band,
                importance,
                percentage: if max > 0.0 {
                    importance / max * 100.0
                } else {
                    0.0
                },
            })
            .collect()
    }
}

/// A self-describing trained model bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Human-readable model name (e.g. the winning family)
    pub name: String,
    /// Crate version that produced the artifact
    pub version: String,
    /// Training timestamp
    pub trained_at: DateTime<Utc>,
    /// Expected number of input bands
    pub band_count: usize,
    /// Class labels in label order
    pub class_labels: [String; 2],
    /// Ranked discriminative bands (empty when the family has no importances)
    pub risk_factors: Vec<RiskFactor>,
    /// The fitted pipeline
    pub engine: TrainEngine,
}

impl ModelArtifact {
    /// Bundle a fitted engine
    pub fn from_engine(name: impl Into<String>, engine: TrainEngine) -> Result<Self> {
        if !engine.is_fitted() {
            return Err(SonarError::ModelNotFitted);
        }

        let risk_factors = engine
            .feature_importances()
            .map(|imp| RiskFactor::ranked(&imp))
            .unwrap_or_default();

        Ok(Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            trained_at: Utc::now(),
            band_count: engine.feature_names().len(),
            class_labels: ["Rock".to_string(), "Mine".to_string()],
            risk_factors,
            engine,
        })
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate an artifact
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let artifact: Self = serde_json::from_str(&json)?;

        if !artifact.engine.is_fitted() {
            return Err(SonarError::InferenceError(format!(
                "Artifact {} contains an unfitted engine",
                path.display()
            )));
        }
        if artifact.band_count != BAND_COUNT {
            return Err(SonarError::InferenceError(format!(
                "Artifact {} expects {} bands, this build expects {}",
                path.display(),
                artifact.band_count,
                BAND_COUNT
            )));
        }

        Ok(artifact)
    }
}
