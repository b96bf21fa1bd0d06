//! Cross-validation splitters

use crate::error::{Result, SonarError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CvStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution per fold)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CvStrategy {
    fn default() -> Self {
        CvStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: true,
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CvSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CvStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CvStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate train/test splits. Stratified splitting requires labels.
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CvSplit>> {
        match &self.strategy {
            CvStrategy::KFold { n_splits, shuffle } => {
                self.k_fold_split(n_samples, *n_splits, *shuffle)
            }
            CvStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| {
                    SonarError::ValidationError(
                        "StratifiedKFold requires the target array".to_string(),
                    )
                })?;
                self.stratified_k_fold_split(y, *n_splits, *shuffle)
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Result<Vec<CvSplit>> {
        if n_splits < 2 {
            return Err(SonarError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(SonarError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let fold_sizes: Vec<usize> = (0..n_splits)
            .map(|i| {
                let base = n_samples / n_splits;
                let remainder = n_samples % n_splits;
                if i < remainder {
                    base + 1
                } else {
                    base
                }
            })
            .collect();

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = fold_sizes[fold_idx];
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }

    fn stratified_k_fold_split(
        &self,
        y: &Array1<f64>,
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CvSplit>> {
        if n_splits < 2 {
            return Err(SonarError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }

        // Group sample indices by class label
        let mut class_indices: std::collections::HashMap<i64, Vec<usize>> =
            std::collections::HashMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        let mut rng = self.rng();
        if shuffle {
            // Deterministic class order so the seed fully controls the layout
            let mut classes: Vec<i64> = class_indices.keys().copied().collect();
            classes.sort_unstable();
            for class in classes {
                if let Some(indices) = class_indices.get_mut(&class) {
                    indices.shuffle(&mut rng);
                }
            }
        }

        // Round-robin each class's samples across the folds
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        let mut classes: Vec<i64> = class_indices.keys().copied().collect();
        classes.sort_unstable();
        for class in classes {
            for (i, &idx) in class_indices[&class].iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }

        let mut splits = Vec::with_capacity(n_splits);
        for fold_idx in 0..n_splits {
            let test_indices = folds[fold_idx].clone();
            let train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();

            if test_indices.is_empty() || train_indices.is_empty() {
                return Err(SonarError::ValidationError(format!(
                    "Fold {} is empty; too many splits for {} samples",
                    fold_idx,
                    y.len()
                )));
            }

            splits.push(CvSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn labels(n_rock: usize, n_mine: usize) -> Array1<f64> {
        let mut v = vec![0.0; n_rock];
        v.extend(vec![1.0; n_mine]);
        Array1::from_vec(v)
    }

    #[test]
    fn test_k_fold_covers_all_samples() {
        let cv = CrossValidator::new(CvStrategy::KFold {
            n_splits: 4,
            shuffle: true,
        })
        .with_random_state(42);

        let splits = cv.split(20, None).unwrap();
        assert_eq!(splits.len(), 4);

        let mut seen: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 20);
        }
    }

    #[test]
    fn test_stratified_preserves_class_balance() {
        let y = labels(20, 10);
        let cv = CrossValidator::new(CvStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: true,
        })
        .with_random_state(7);

        let splits = cv.split(30, Some(&y)).unwrap();
        for split in &splits {
            let mines = split.test_indices.iter().filter(|&&i| y[i] > 0.5).count();
            let rocks = split.test_indices.len() - mines;
            assert_eq!(rocks, 4, "each fold should hold 4 rocks");
            assert_eq!(mines, 2, "each fold should hold 2 mines");
        }
    }

    #[test]
    fn test_stratified_requires_labels() {
        let cv = CrossValidator::new(CvStrategy::StratifiedKFold {
            n_splits: 3,
            shuffle: false,
        });
        assert!(cv.split(10, None).is_err());
    }

    #[test]
    fn test_seeded_splits_are_reproducible() {
        let y = labels(12, 12);
        let make = || {
            CrossValidator::new(CvStrategy::StratifiedKFold {
                n_splits: 3,
                shuffle: true,
            })
            .with_random_state(99)
            .split(24, Some(&y))
            .unwrap()
        };

        let a = make();
        let b = make();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_too_few_splits_rejected() {
        let cv = CrossValidator::new(CvStrategy::KFold {
            n_splits: 1,
            shuffle: false,
        });
        assert!(cv.split(10, None).is_err());
    }
}
