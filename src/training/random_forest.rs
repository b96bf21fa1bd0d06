//! Random forest classifier

use crate::error::{Result, SonarError};
use super::decision_tree::DecisionTree;
use ndarray::{Array1, Array2};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for the number of features sampled per split
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of the feature count
    Sqrt,
    /// Log2 of the feature count
    Log2,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let k = match self {
            Self::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            Self::Log2 => (n_features as f64).log2().ceil() as usize,
            Self::Fixed(n) => (*n).min(n_features),
            Self::All => n_features,
        };
        k.max(1)
    }
}

/// Bagged ensemble of Gini decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
}

impl Default for RandomForestClassifier {
    fn default() -> Self {
        Self::new(200)
    }
}

impl RandomForestClassifier {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: MaxFeatures::Sqrt,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest: each tree trains on a bootstrap sample with its own
    /// derived seed, in parallel.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(SonarError::TrainingError(
                "Cannot fit a forest on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let max_features = self.max_features.resolve(self.n_features);

        // One seed per tree drawn from the master RNG keeps runs reproducible
        // even though trees train in parallel.
        let mut master_rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let tree_seeds: Vec<u64> = (0..self.n_estimators)
            .map(|_| master_rng.next_u64())
            .collect();

        let trees: Vec<Result<DecisionTree>> = tree_seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                // Bootstrap sample with replacement
                let indices: Vec<usize> = (0..n_samples)
                    .map(|_| rng.gen_range(0..n_samples))
                    .collect();
                let x_boot = x.select(ndarray::Axis(0), &indices);
                let y_boot = Array1::from_iter(indices.iter().map(|&i| y[i]));

                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_max_features(max_features)
                    .with_random_state(rng.next_u64());
                if let Some(depth) = self.max_depth {
                    tree = tree.with_max_depth(depth);
                }
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees.into_iter().collect::<Result<Vec<_>>>()?;

        // Average importances over trees
        let mut importances = Array1::zeros(self.n_features);
        let mut counted = 0usize;
        for tree in &self.trees {
            if let Some(tree_imp) = tree.feature_importances() {
                for (j, &v) in tree_imp.iter().enumerate() {
                    importances[j] += v;
                }
                counted += 1;
            }
        }
        if counted > 0 {
            importances.mapv_inplace(|v| v / counted as f64);
        }
        self.feature_importances = Some(importances);

        Ok(self)
    }

    /// Predict class labels by majority vote
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Mine-class probability: mean of the trees' leaf fractions
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(SonarError::ModelNotFitted);
        }

        let per_tree: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict_raw(x))
            .collect::<Result<Vec<_>>>()?;

        let mut avg = Array1::zeros(x.nrows());
        for preds in &per_tree {
            avg += preds;
        }
        avg.mapv_inplace(|v| v / self.trees.len() as f64);
        Ok(avg)
    }

    /// Mean impurity-decrease importances across trees
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..12 {
            let jitter = i as f64 * 0.01;
            rows.extend_from_slice(&[0.1 + jitter, 0.9 - jitter, 0.2]);
            labels.push(0.0);
            rows.extend_from_slice(&[0.9 - jitter, 0.1 + jitter, 0.8]);
            labels.push(1.0);
        }
        (
            Array2::from_shape_vec((24, 3), rows).unwrap(),
            Array1::from_vec(labels),
        )
    }

    #[test]
    fn test_forest_fits_separable_data() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(25)
            .with_max_depth(5)
            .with_random_state(42);
        forest.fit(&x, &y).unwrap();

        let preds = forest.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count();
        assert!(correct as f64 / y.len() as f64 > 0.9);
    }

    #[test]
    fn test_probabilities_bounded() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(10).with_random_state(1);
        forest.fit(&x, &y).unwrap();

        for p in forest.predict_proba(&x).unwrap().iter() {
            assert!((0.0..=1.0).contains(p));
        }
    }

    #[test]
    fn test_seeded_forest_is_reproducible() {
        let (x, y) = separable_data();

        let run = || {
            let mut forest = RandomForestClassifier::new(10).with_random_state(7);
            forest.fit(&x, &y).unwrap();
            forest.predict_proba(&x).unwrap()
        };

        let a = run();
        let b = run();
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert!((pa - pb).abs() < 1e-12);
        }
    }

    #[test]
    fn test_importances_present() {
        let (x, y) = separable_data();
        let mut forest = RandomForestClassifier::new(10).with_random_state(3);
        forest.fit(&x, &y).unwrap();

        let importances = forest.feature_importances().unwrap();
        assert_eq!(importances.len(), 3);
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let forest = RandomForestClassifier::new(5);
        assert!(forest.predict(&array![[0.0, 1.0, 0.5]]).is_err());
    }
}
