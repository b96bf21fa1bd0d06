//! Model training module
//!
//! Binary rock-vs-mine classifiers trained on scaled 60-band readings:
//! - Logistic regression
//! - Random forest
//! - Support vector machine (SMO)
//! - Gradient boosted trees
//! - K-nearest neighbors
//! - Gaussian naive Bayes
//!
//! Plus stratified cross-validation, holdout metrics, and model selection.

mod config;
mod engine;
mod metrics;
pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod knn;
pub mod linear;
pub mod naive_bayes;
pub mod random_forest;
pub mod svm;

pub use config::{ModelType, TrainingConfig};
pub use cross_validation::{CrossValidator, CvSplit, CvStrategy};
pub use engine::{ModelComparison, TrainEngine, TrainedClassifier};
pub use metrics::{ClassificationMetrics, CvResults};

pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use knn::{DistanceMetric, KnnClassifier, KnnConfig, WeightScheme};
pub use linear::LogisticRegression;
pub use naive_bayes::GaussianNaiveBayes;
pub use random_forest::{MaxFeatures, RandomForestClassifier};
pub use svm::{KernelType, SvmClassifier, SvmConfig};
