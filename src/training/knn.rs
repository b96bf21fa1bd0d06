//! K-nearest-neighbors classifier

use crate::error::{Result, SonarError};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Euclidean
    }
}

/// Weighting scheme for neighbor votes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightScheme {
    /// All neighbors weigh equally
    Uniform,
    /// Closer neighbors weigh more (inverse distance)
    Distance,
}

impl Default for WeightScheme {
    fn default() -> Self {
        Self::Distance
    }
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
    /// Vote weighting
    pub weights: WeightScheme,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Distance,
        }
    }
}

/// K-nearest-neighbors binary classifier. Fitting stores the training data;
/// queries are parallelized over rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    config: KnnConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KnnClassifier {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Create with default config and the given k
    pub fn with_k(k: usize) -> Self {
        Self::new(KnnConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit the classifier (stores the training set)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(SonarError::TrainingError(
                "Cannot fit on zero samples".to_string(),
            ));
        }
        if self.config.n_neighbors == 0 {
            return Err(SonarError::TrainingError(
                "n_neighbors must be at least 1".to_string(),
            ));
        }

        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Mine-class probability: weighted vote fraction among the k nearest
    /// training points.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(SonarError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(SonarError::ModelNotFitted)?;

        if x.ncols() != x_train.ncols() {
            return Err(SonarError::ShapeError {
                expected: format!("{} columns", x_train.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let k = self.config.n_neighbors.min(x_train.nrows());
        let metric = self.config.metric;
        let weights = self.config.weights;

        let probs: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);

                let mut neighbors: Vec<(f64, f64)> = x_train
                    .rows()
                    .into_iter()
                    .zip(y_train.iter())
                    .map(|(train_row, &label)| {
                        let dist = match metric {
                            DistanceMetric::Euclidean => row
                                .iter()
                                .zip(train_row.iter())
                                .map(|(a, b)| (a - b).powi(2))
                                .sum::<f64>()
                                .sqrt(),
                            DistanceMetric::Manhattan => row
                                .iter()
                                .zip(train_row.iter())
                                .map(|(a, b)| (a - b).abs())
                                .sum::<f64>(),
                        };
                        (dist, label)
                    })
                    .collect();

                neighbors.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                neighbors.truncate(k);

                let mut mine_weight = 0.0;
                let mut total_weight = 0.0;
                for &(dist, label) in &neighbors {
                    let w = match weights {
                        WeightScheme::Uniform => 1.0,
                        WeightScheme::Distance => 1.0 / (dist + 1e-10),
                    };
                    total_weight += w;
                    if label > 0.5 {
                        mine_weight += w;
                    }
                }

                if total_weight > 0.0 {
                    mine_weight / total_weight
                } else {
                    0.5
                }
            })
            .collect();

        Ok(Array1::from_vec(probs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [0.1, 0.1],
            [0.2, 0.15],
            [0.15, 0.2],
            [0.12, 0.12],
            [0.9, 0.9],
            [0.8, 0.85],
            [0.85, 0.8],
            [0.88, 0.88],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn test_knn_classifies_separable_clusters() {
        let (x, y) = separable_data();
        let mut knn = KnnClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();

        let preds = knn.predict(&array![[0.14, 0.14], [0.86, 0.86]]).unwrap();
        assert_eq!(preds[0], 0.0);
        assert_eq!(preds[1], 1.0);
    }

    #[test]
    fn test_proba_is_vote_fraction() {
        let (x, y) = separable_data();
        let mut knn = KnnClassifier::new(KnnConfig {
            n_neighbors: 3,
            weights: WeightScheme::Uniform,
            ..Default::default()
        });
        knn.fit(&x, &y).unwrap();

        let probs = knn.predict_proba(&array![[0.14, 0.14]]).unwrap();
        // All three nearest neighbors are rocks
        assert!((probs[0] - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_k_larger_than_training_set_is_clamped() {
        let (x, y) = separable_data();
        let mut knn = KnnClassifier::with_k(100);
        knn.fit(&x, &y).unwrap();

        let probs = knn.predict_proba(&array![[0.5, 0.5]]).unwrap();
        assert!(probs[0].is_finite());
    }

    #[test]
    fn test_dimension_mismatch_errors() {
        let (x, y) = separable_data();
        let mut knn = KnnClassifier::with_k(3);
        knn.fit(&x, &y).unwrap();
        assert!(knn.predict(&array![[0.5]]).is_err());
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let knn = KnnClassifier::with_k(3);
        assert!(knn.predict(&array![[0.5, 0.5]]).is_err());
    }
}
