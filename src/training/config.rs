//! Training configuration

use crate::error::{Result, SonarError};
use crate::preprocessing::ScalerKind;
use serde::{Deserialize, Serialize};

/// Type of classifier to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelType {
    LogisticRegression,
    RandomForest,
    Svm,
    GradientBoosting,
    Knn,
    NaiveBayes,
}

impl ModelType {
    /// All trainable families, in comparison order
    pub const ALL: [ModelType; 6] = [
        ModelType::LogisticRegression,
        ModelType::RandomForest,
        ModelType::Svm,
        ModelType::GradientBoosting,
        ModelType::Knn,
        ModelType::NaiveBayes,
    ];

    /// Display name used in comparison tables and artifacts
    pub fn name(&self) -> &'static str {
        match self {
            Self::LogisticRegression => "Logistic Regression",
            Self::RandomForest => "Random Forest",
            Self::Svm => "SVM (RBF)",
            Self::GradientBoosting => "Gradient Boosting",
            Self::Knn => "KNN",
            Self::NaiveBayes => "Naive Bayes",
        }
    }
}

impl std::str::FromStr for ModelType {
    type Err = SonarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "logistic" | "logistic_regression" => Ok(Self::LogisticRegression),
            "random_forest" | "forest" => Ok(Self::RandomForest),
            "svm" => Ok(Self::Svm),
            "gradient_boosting" | "gbt" => Ok(Self::GradientBoosting),
            "knn" => Ok(Self::Knn),
            "naive_bayes" | "nb" => Ok(Self::NaiveBayes),
            other => Err(SonarError::InvalidInput(format!(
                "Unknown model type: {} (expected logistic, random_forest, svm, gradient_boosting, knn, naive_bayes)",
                other
            ))),
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Classifier family to train
    pub model_type: ModelType,

    /// Target column name
    pub target_column: String,

    /// Scaler applied before the classifier
    pub scaler: ScalerKind,

    /// Holdout fraction for the validation split
    pub validation_split: f64,

    /// Number of stratified cross-validation folds (0 = no CV)
    pub cv_folds: usize,

    /// Random seed for reproducibility
    pub random_state: Option<u64>,

    // Tree/ensemble parameters
    /// Number of trees (forest, boosting)
    pub n_estimators: usize,

    /// Maximum tree depth
    pub max_depth: Option<usize>,

    /// Minimum samples to split an internal node
    pub min_samples_split: usize,

    /// Minimum samples in a leaf
    pub min_samples_leaf: usize,

    /// Learning rate (boosting, logistic regression)
    pub learning_rate: f64,

    // Family-specific parameters
    /// Neighbors for KNN
    pub n_neighbors: usize,

    /// Regularization parameter C for SVM
    pub svm_c: f64,

    /// Maximum optimizer iterations (logistic regression, SVM)
    pub max_iter: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::LogisticRegression,
            target_column: "label".to_string(),
            scaler: ScalerKind::Standard,
            validation_split: 0.2,
            cv_folds: 5,
            random_state: Some(42),
            n_estimators: 200,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            learning_rate: 0.1,
            n_neighbors: 5,
            svm_c: 1.0,
            max_iter: 1000,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration for one model family
    pub fn new(model_type: ModelType) -> Self {
        Self {
            model_type,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_scaler(mut self, scaler: ScalerKind) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn with_cv(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = k;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.validation_split, 0.2);
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.target_column, "label");
    }

    #[test]
    fn test_builder_pattern() {
        let config = TrainingConfig::new(ModelType::RandomForest)
            .with_n_estimators(100)
            .with_max_depth(6)
            .with_cv(10);

        assert_eq!(config.model_type, ModelType::RandomForest);
        assert_eq!(config.n_estimators, 100);
        assert_eq!(config.max_depth, Some(6));
        assert_eq!(config.cv_folds, 10);
    }

    #[test]
    fn test_model_type_parsing() {
        assert_eq!("svm".parse::<ModelType>().unwrap(), ModelType::Svm);
        assert_eq!("gbt".parse::<ModelType>().unwrap(), ModelType::GradientBoosting);
        assert!("quantum".parse::<ModelType>().is_err());
    }
}
