//! Decision tree building block
//!
//! Binary-label trees used directly by the random forest (Gini) and as
//! residual regressors inside gradient boosting (MSE). Leaves store the mean
//! of their targets, which for 0/1 labels doubles as the mine-class fraction
//! used for probability estimates.

use crate::error::{Result, SonarError};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with mean target value
    Leaf { value: f64, n_samples: usize },
    /// Internal node with a threshold split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// Gini impurity over 0/1 labels (classification)
    Gini,
    /// Variance reduction (regression, boosting residuals)
    Mse,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features sampled per split (None = all features)
    pub max_features: Option<usize>,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
    n_features: usize,
    feature_importances: Option<Vec<f64>>,
}

impl DecisionTree {
    /// Create a classification tree (Gini)
    pub fn new_classifier() -> Self {
        Self::new(Criterion::Gini)
    }

    /// Create a regression tree (MSE)
    pub fn new_regressor() -> Self {
        Self::new(Criterion::Mse)
    }

    fn new(criterion: Criterion) -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion,
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

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
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
                "Cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(importances);

        Ok(self)
    }

    /// Raw leaf values: the class fraction (Gini) or mean target (MSE)
    pub fn predict_raw(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(SonarError::ModelNotFitted)?;

        let values: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let row = x.row(i);
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { value, .. } => return *value,
                        TreeNode::Split {
                            feature_idx,
                            threshold,
                            left,
                            right,
                            ..
                        } => {
                            node = if row[*feature_idx] <= *threshold {
                                left.as_ref()
                            } else {
                                right.as_ref()
                            };
                        }
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(values))
    }

    /// Predict labels (classification rounds the leaf fraction)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let raw = self.predict_raw(x)?;
        Ok(match self.criterion {
            Criterion::Gini => raw.mapv(|v| if v >= 0.5 { 1.0 } else { 0.0 }),
            Criterion::Mse => raw,
        })
    }

    /// Normalized impurity-decrease importances
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = sums(y, indices);
        let mean = sum / n_samples as f64;
        let parent_impurity = self.impurity(n_samples, sum, sq_sum);

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 1e-12;

        if should_stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        let feature_pool = self.sample_features(rng);

        if let Some((feature_idx, threshold, gain)) =
            self.find_best_split(x, y, indices, &feature_pool, parent_impurity)
        {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, feature_idx]] <= threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    value: mean,
                    n_samples,
                };
            }

            importances[feature_idx] += n_samples as f64 * gain;

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                value: mean,
                n_samples,
            }
        }
    }

    /// Feature indices considered at one split
    fn sample_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let mut all: Vec<usize> = (0..self.n_features).collect();
        match self.max_features {
            Some(k) if k < self.n_features => {
                all.shuffle(rng);
                all.truncate(k.max(1));
                all
            }
            _ => all,
        }
    }

    /// Best split across the candidate features: sorted scan per feature with
    /// running left/right statistics.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        features: &[usize],
        parent_impurity: f64,
    ) -> Option<(usize, f64, f64)> {
        let n = indices.len();
        let (total_sum, total_sq_sum) = sums(y, indices);

        let best_per_feature: Vec<Option<(usize, f64, f64)>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut sorted: Vec<usize> = indices.to_vec();
                sorted.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut left_count = 0usize;
                let mut left_sum = 0.0;
                let mut left_sq_sum = 0.0;

                let mut best: Option<(usize, f64, f64)> = None;

                for w in 0..n - 1 {
                    let idx = sorted[w];
                    let yi = y[idx];
                    left_count += 1;
                    left_sum += yi;
                    left_sq_sum += yi * yi;

                    let current = x[[idx, feature_idx]];
                    let next = x[[sorted[w + 1], feature_idx]];
                    if (next - current).abs() < f64::EPSILON {
                        continue;
                    }

                    let right_count = n - left_count;
                    if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                        continue;
                    }

                    let left_impurity = self.impurity(left_count, left_sum, left_sq_sum);
                    let right_impurity = self.impurity(
                        right_count,
                        total_sum - left_sum,
                        total_sq_sum - left_sq_sum,
                    );
                    let weighted = (left_count as f64 * left_impurity
                        + right_count as f64 * right_impurity)
                        / n as f64;

                    let gain = parent_impurity - weighted;
                    if gain > best.map_or(0.0, |(_, _, g)| g) {
                        best = Some((feature_idx, (current + next) / 2.0, gain));
                    }
                }

                best
            })
            .collect();

        best_per_feature
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Impurity from running statistics. With 0/1 labels the mean is the
    /// positive fraction, so Gini = 2p(1-p); MSE is the variance.
    fn impurity(&self, count: usize, sum: f64, sq_sum: f64) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        let mean = sum / n;
        match self.criterion {
            Criterion::Gini => 2.0 * mean * (1.0 - mean),
            Criterion::Mse => (sq_sum / n - mean * mean).max(0.0),
        }
    }
}

fn sums(y: &Array1<f64>, indices: &[usize]) -> (f64, f64) {
    let mut sum = 0.0;
    let mut sq_sum = 0.0;
    for &i in indices {
        let v = y[i];
        sum += v;
        sq_sum += v * v;
    }
    (sum, sq_sum)
}
