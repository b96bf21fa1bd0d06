//! Prediction interpretation: confidence bands, risk policy, equipment info
//!
//! All thresholds here drive the operator-facing output: which class was
//! detected, how sure the model is, and what the recommended action is.

use crate::error::{Result, SonarError};
use serde::{Deserialize, Serialize};

/// Number of SONAR frequency bands per reading
pub const BAND_COUNT: usize = 60;

/// Detected object class. Class encoding is fixed: 0 = rock, 1 = mine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectClass {
    Rock,
    Mine,
}

impl ObjectClass {
    /// Decode a model output label
    pub fn from_label(label: f64) -> Self {
        if label >= 0.5 {
            Self::Mine
        } else {
            Self::Rock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rock => "Rock",
            Self::Mine => "Mine",
        }
    }
}

/// Confidence descriptor derived from the winning-class probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Moderate,
    Fair,
    Low,
}

impl ConfidenceLevel {
    /// Bucket a confidence percentage (0-100)
    pub fn from_percent(confidence: f64) -> Self {
        if confidence >= 95.0 {
            Self::VeryHigh
        } else if confidence >= 80.0 {
            Self::High
        } else if confidence >= 65.0 {
            Self::Moderate
        } else if confidence >= 50.0 {
            Self::Fair
        } else {
            Self::Low
        }
    }

    /// Operator-facing range string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High (95-100%)",
            Self::High => "High (80-95%)",
            Self::Moderate => "Moderate (65-80%)",
            Self::Fair => "Fair (50-65%)",
            Self::Low => "Low (<50%)",
        }
    }
}

/// Risk classification of a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Safe,
    LikelySafe,
    Uncertain,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Moderate => "MODERATE",
            Self::Safe => "SAFE",
            Self::LikelySafe => "LIKELY SAFE",
            Self::Uncertain => "UNCERTAIN",
        }
    }
}

/// Characteristics of the detected object class
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectCharacteristics {
    pub object_type: String,
    pub description: String,
    pub typical_signals: String,
    pub risk_message: String,
}

/// Full interpretation of one prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub object_class: ObjectClass,
    /// Winning-class probability as a percentage (0-100)
    pub confidence_percent: f64,
    pub confidence_level: ConfidenceLevel,
    pub prediction_text: String,
    pub risk_level: RiskLevel,
    pub recommendation: String,
    /// Traffic-light style color code: red, orange, green, or yellow
    pub risk_color: String,
    pub rock_probability: f64,
    pub mine_probability: f64,
    pub characteristics: ObjectCharacteristics,
}

impl Assessment {
    /// Build an assessment from rock/mine class probabilities (each 0-1)
    pub fn from_probabilities(rock_probability: f64, mine_probability: f64) -> Self {
        let object_class = if mine_probability >= rock_probability {
            ObjectClass::Mine
        } else {
            ObjectClass::Rock
        };

        let confidence_percent = match object_class {
            ObjectClass::Mine => mine_probability * 100.0,
            ObjectClass::Rock => rock_probability * 100.0,
        };

        let (risk_level, recommendation) = risk_policy(object_class, confidence_percent);

        let prediction_text = match object_class {
            ObjectClass::Mine => "MINE ALERT".to_string(),
            ObjectClass::Rock => "ROCK DETECTED".to_string(),
        };

        Self {
            object_class,
            confidence_percent,
            confidence_level: ConfidenceLevel::from_percent(confidence_percent),
            prediction_text,
            risk_level,
            recommendation,
            risk_color: risk_color(object_class, confidence_percent).to_string(),
            rock_probability: rock_probability * 100.0,
            mine_probability: mine_probability * 100.0,
            characteristics: characteristics(object_class),
        }
    }
}

/// Risk level and recommended action for a detection
fn risk_policy(class: ObjectClass, confidence: f64) -> (RiskLevel, String) {
    match class {
        ObjectClass::Mine => {
            if confidence >= 90.0 {
                (
                    RiskLevel::Critical,
                    "IMMEDIATE EVASION REQUIRED! Confidence in mine detection is critical."
                        .to_string(),
                )
            } else if confidence >= 75.0 {
                (
                    RiskLevel::High,
                    "HIGH ALERT! Mine detection is probable. Recommend immediate evasion and reporting."
                        .to_string(),
                )
            } else {
                (
                    RiskLevel::Moderate,
                    "CAUTION - Possible mine detected. Recommend further investigation before proceeding."
                        .to_string(),
                )
            }
        }
        ObjectClass::Rock => {
            if confidence >= 90.0 {
                (
                    RiskLevel::Safe,
                    "SAFE - High confidence this is a natural rock. Safe to proceed.".to_string(),
                )
            } else if confidence >= 75.0 {
                (
                    RiskLevel::LikelySafe,
                    "Likely safe. This appears to be a natural formation. Exercise normal caution."
                        .to_string(),
                )
            } else {
                (
                    RiskLevel::Uncertain,
                    "Uncertain - Object may be rock or mine. Recommend detailed analysis.".to_string(),
                )
            }
        }
    }
}

/// Traffic-light color for a detection
fn risk_color(class: ObjectClass, confidence: f64) -> &'static str {
    match class {
        ObjectClass::Mine if confidence >= 75.0 => "red",
        ObjectClass::Mine => "orange",
        ObjectClass::Rock if confidence >= 90.0 => "green",
        ObjectClass::Rock => "yellow",
    }
}

fn characteristics(class: ObjectClass) -> ObjectCharacteristics {
    match class {
        ObjectClass::Rock => ObjectCharacteristics {
            object_type: "Rock".to_string(),
            description: "Natural underwater rock formation".to_string(),
            typical_signals: "Smooth, distributed reflections across frequency bands".to_string(),
            risk_message: "Safe - This is a natural rock formation".to_string(),
        },
        ObjectClass::Mine => ObjectCharacteristics {
            object_type: "Mine".to_string(),
            description: "Likely explosive device or mine".to_string(),
            typical_signals: "Concentrated, sharp reflections in high-frequency bands".to_string(),
            risk_message: "ALERT - Likely mine detected! Recommend immediate evasion".to_string(),
        },
    }
}

/// Validate a raw 60-band reading: exact length, finite values in [0, 1]
pub fn validate_bands(values: &[f64]) -> Result<()> {
    if values.len() != BAND_COUNT {
        return Err(SonarError::ValidationError(format!(
            "Must provide exactly {} frequency band values, got {}",
            BAND_COUNT,
            values.len()
        )));
    }

    for (i, &v) in values.iter().enumerate() {
        if !v.is_finite() || !(0.0..=1.0).contains(&v) {
            return Err(SonarError::ValidationError(format!(
                "Frequency band {} has invalid value {}. Must be between 0 and 1.",
                i, v
            )));
        }
    }

    Ok(())
}

/// Characterization of one frequency-band group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandGroup {
    pub range: String,
    pub typical_for: String,
}

/// Static SONAR equipment and signal information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SonarInfo {
    pub frequency_bands: usize,
    pub frequency_range: String,
    pub equipment: String,
    pub application: String,
    pub low_frequencies: BandGroup,
    pub mid_frequencies: BandGroup,
    pub high_frequencies: BandGroup,
}

/// Equipment info served by the API and rendered on the web pages
pub fn sonar_info() -> SonarInfo {
    SonarInfo {
        frequency_bands: BAND_COUNT,
        frequency_range: "11.25 kHz to 100 kHz".to_string(),
        equipment: "Goodman Tonals & Mirrorbird Standard SONAR".to_string(),
        application: "Underwater object detection (mine detection)".to_string(),
        low_frequencies: BandGroup {
            range: "Bands 0-19".to_string(),
            typical_for: "Rock reflections".to_string(),
        },
        mid_frequencies: BandGroup {
            range: "Bands 20-40".to_string(),
            typical_for: "Mixed signals".to_string(),
        },
        high_frequencies: BandGroup {
            range: "Bands 41-59".to_string(),
            typical_for: "Mine signatures".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_levels() {
        assert_eq!(ConfidenceLevel::from_percent(97.0), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_percent(95.0), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_percent(85.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_percent(70.0), ConfidenceLevel::Moderate);
        assert_eq!(ConfidenceLevel::from_percent(55.0), ConfidenceLevel::Fair);
        assert_eq!(ConfidenceLevel::from_percent(40.0), ConfidenceLevel::Low);
    }

    #[test]
    fn test_mine_risk_policy() {
        let a = Assessment::from_probabilities(0.05, 0.95);
        assert_eq!(a.object_class, ObjectClass::Mine);
        assert_eq!(a.risk_level, RiskLevel::Critical);
        assert_eq!(a.risk_color, "red");

        let a = Assessment::from_probabilities(0.20, 0.80);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(a.risk_color, "red");

        let a = Assessment::from_probabilities(0.40, 0.60);
        assert_eq!(a.risk_level, RiskLevel::Moderate);
        assert_eq!(a.risk_color, "orange");
    }

    #[test]
    fn test_rock_risk_policy() {
        let a = Assessment::from_probabilities(0.95, 0.05);
        assert_eq!(a.object_class, ObjectClass::Rock);
        assert_eq!(a.risk_level, RiskLevel::Safe);
        assert_eq!(a.risk_color, "green");

        let a = Assessment::from_probabilities(0.80, 0.20);
        assert_eq!(a.risk_level, RiskLevel::LikelySafe);
        assert_eq!(a.risk_color, "yellow");

        let a = Assessment::from_probabilities(0.60, 0.40);
        assert_eq!(a.risk_level, RiskLevel::Uncertain);
    }

    #[test]
    fn test_confidence_tracks_winning_class() {
        let a = Assessment::from_probabilities(0.30, 0.70);
        assert!((a.confidence_percent - 70.0).abs() < 1e-9);
        assert!((a.rock_probability - 30.0).abs() < 1e-9);
        assert!((a.mine_probability - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_bands() {
        let good = vec![0.5; BAND_COUNT];
        assert!(validate_bands(&good).is_ok());

        let short = vec![0.5; 10];
        assert!(validate_bands(&short).is_err());

        let mut out_of_range = vec![0.5; BAND_COUNT];
        out_of_range[7] = 1.5;
        let err = validate_bands(&out_of_range).unwrap_err();
        assert!(err.to_string().contains("band 7"));

        let mut non_finite = vec![0.5; BAND_COUNT];
        non_finite[0] = f64::NAN;
        assert!(validate_bands(&non_finite).is_err());
    }
}
