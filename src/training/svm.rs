//! Support vector machine classifier
//!
//! Binary SVM trained with a simplified SMO loop over a precomputed kernel
//! matrix. Labels are mapped to -1/+1 internally; probabilities come from a
//! sigmoid over the decision function.

use crate::error::{Result, SonarError};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x . y
    Linear,
    /// Radial basis function: K(x, y) = exp(-gamma * ||x - y||^2)
    Rbf { gamma: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Rbf { gamma: 1.0 }
    }
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmConfig {
    /// Regularization parameter C
    pub c: f64,
    /// Kernel function
    pub kernel: KernelType,
    /// KKT violation tolerance
    pub tol: f64,
    /// Maximum passes without an alpha update before stopping
    pub max_passes: usize,
    /// Hard cap on optimization sweeps
    pub max_iter: usize,
    /// Random seed for partner-alpha selection
    pub random_state: Option<u64>,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::Rbf { gamma: 1.0 },
            tol: 1e-3,
            max_passes: 5,
            max_iter: 1000,
            random_state: Some(42),
        }
    }
}

impl SvmConfig {
    /// RBF gamma = 1 / n_features, the usual default for scaled inputs
    pub fn rbf_for_features(n_features: usize) -> Self {
        Self {
            kernel: KernelType::Rbf {
                gamma: 1.0 / n_features.max(1) as f64,
            },
            ..Default::default()
        }
    }
}

/// Binary support vector classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmClassifier {
    config: SvmConfig,
    support_vectors: Option<Array2<f64>>,
    /// alpha_i * y_i for each support vector
    dual_coefs: Option<Array1<f64>>,
    bias: f64,
    is_fitted: bool,
}

impl SvmClassifier {
    pub fn new(config: SvmConfig) -> Self {
        Self {
            config,
            support_vectors: None,
            dual_coefs: None,
            bias: 0.0,
            is_fitted: false,
        }
    }

    /// Fit on 0/1 labels
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} targets", n),
                actual: format!("{} targets", y.len()),
            });
        }
        if n == 0 {
            return Err(SonarError::TrainingError(
                "Cannot fit on zero samples".to_string(),
            ));
        }

        // Map 0/1 to -1/+1
        let y_signed: Array1<f64> = y.mapv(|v| if v >= 0.5 { 1.0 } else { -1.0 });
        if y_signed.iter().all(|&v| v > 0.0) || y_signed.iter().all(|&v| v < 0.0) {
            return Err(SonarError::TrainingError(
                "SVM requires both classes in the training data".to_string(),
            ));
        }

        let kernel = self.kernel_matrix(x);

        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        let c = self.config.c;
        let tol = self.config.tol;
        let mut alphas = Array1::<f64>::zeros(n);
        let mut bias = 0.0;

        let decision = |alphas: &Array1<f64>, bias: f64, i: usize| -> f64 {
            let mut sum = bias;
            for j in 0..n {
                if alphas[j] > 0.0 {
                    sum += alphas[j] * y_signed[j] * kernel[[j, i]];
                }
            }
            sum
        };

        let mut passes = 0;
        let mut iter = 0;
        while passes < self.config.max_passes && iter < self.config.max_iter {
            let mut changed = 0;

            for i in 0..n {
                let err_i = decision(&alphas, bias, i) - y_signed[i];

                let violates_kkt = (y_signed[i] * err_i < -tol && alphas[i] < c)
                    || (y_signed[i] * err_i > tol && alphas[i] > 0.0);
                if !violates_kkt {
                    continue;
                }

                // Random partner distinct from i
                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                let err_j = decision(&alphas, bias, j) - y_signed[j];

                let alpha_i_old = alphas[i];
                let alpha_j_old = alphas[j];

                let (low, high) = if (y_signed[i] - y_signed[j]).abs() > f64::EPSILON {
                    let diff = alphas[j] - alphas[i];
                    (diff.max(0.0), (c + diff).min(c))
                } else {
                    let total = alphas[i] + alphas[j];
                    ((total - c).max(0.0), total.min(c))
                };
                if (high - low).abs() < 1e-12 {
                    continue;
                }

                let eta = 2.0 * kernel[[i, j]] - kernel[[i, i]] - kernel[[j, j]];
                if eta >= 0.0 {
                    continue;
                }

                let mut alpha_j_new = alpha_j_old - y_signed[j] * (err_i - err_j) / eta;
                alpha_j_new = alpha_j_new.clamp(low, high);
                if (alpha_j_new - alpha_j_old).abs() < 1e-5 {
                    continue;
                }

                let alpha_i_new =
                    alpha_i_old + y_signed[i] * y_signed[j] * (alpha_j_old - alpha_j_new);

                alphas[i] = alpha_i_new;
                alphas[j] = alpha_j_new;

                let b1 = bias
                    - err_i
                    - y_signed[i] * (alpha_i_new - alpha_i_old) * kernel[[i, i]]
                    - y_signed[j] * (alpha_j_new - alpha_j_old) * kernel[[i, j]];
                let b2 = bias
                    - err_j
                    - y_signed[i] * (alpha_i_new - alpha_i_old) * kernel[[i, j]]
                    - y_signed[j] * (alpha_j_new - alpha_j_old) * kernel[[j, j]];

                bias = if alpha_i_new > 0.0 && alpha_i_new < c {
                    b1
                } else if alpha_j_new > 0.0 && alpha_j_new < c {
                    b2
                } else {
                    (b1 + b2) / 2.0
                };

                changed += 1;
            }

            if changed == 0 {
                passes += 1;
            } else {
                passes = 0;
            }
            iter += 1;
        }

        // Keep only the support vectors
        let support_indices: Vec<usize> = (0..n).filter(|&i| alphas[i] > 1e-8).collect();
        if support_indices.is_empty() {
            return Err(SonarError::TrainingError(
                "SMO converged to zero support vectors".to_string(),
            ));
        }

        let support_vectors = x.select(ndarray::Axis(0), &support_indices);
        let dual_coefs =
            Array1::from_iter(support_indices.iter().map(|&i| alphas[i] * y_signed[i]));

        self.support_vectors = Some(support_vectors);
        self.dual_coefs = Some(dual_coefs);
        self.bias = bias;
        self.is_fitted = true;

        Ok(())
    }

    /// Signed distance from the separating surface
    pub fn decision_function(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(SonarError::ModelNotFitted);
        }
        let sv = self
            .support_vectors
            .as_ref()
            .ok_or(SonarError::ModelNotFitted)?;
        let coefs = self.dual_coefs.as_ref().ok_or(SonarError::ModelNotFitted)?;

        if x.ncols() != sv.ncols() {
            return Err(SonarError::ShapeError {
                expected: format!("{} columns", sv.ncols()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let values: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut sum = self.bias;
                for (sv_row, &coef) in sv.rows().into_iter().zip(coefs.iter()) {
                    sum += coef * kernel_value(self.config.kernel, &row, &sv_row);
                }
                sum
            })
            .collect();

        Ok(Array1::from_vec(values))
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let decision = self.decision_function(x)?;
        Ok(decision.mapv(|d| if d >= 0.0 { 1.0 } else { 0.0 }))
    }

    /// Mine-class probability: sigmoid over the decision value. A squashing
    /// approximation rather than a fitted calibration, but monotone in the
    /// margin, which is what the confidence report needs.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let decision = self.decision_function(x)?;
        Ok(decision.mapv(|d| 1.0 / (1.0 + (-d).exp())))
    }

    fn kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let mut k = Array2::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let v = kernel_value(self.config.kernel, &x.row(i), &x.row(j));
                k[[i, j]] = v;
                k[[j, i]] = v;
            }
        }
        k
    }
}

fn kernel_value(
    kernel: KernelType,
    a: &ndarray::ArrayView1<'_, f64>,
    b: &ndarray::ArrayView1<'_, f64>,
) -> f64 {
    match kernel {
        KernelType::Linear => a.iter().zip(b.iter()).map(|(x, y)| x * y).sum(),
        KernelType::Rbf { gamma } => {
            let sq_dist: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum();
            (-gamma * sq_dist).exp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_data() -> (Array2<f64>, Array1<f64>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..10 {
            let jitter = i as f64 * 0.02;
            rows.extend_from_slice(&[-1.0 - jitter, -1.0 + jitter]);
            labels.push(0.0);
            rows.extend_from_slice(&[1.0 + jitter, 1.0 - jitter]);
            labels.push(1.0);
        }
        (
            Array2::from_shape_vec((20, 2), rows).unwrap(),
            Array1::from_vec(labels),
        )
    }

    #[test]
    fn test_svm_separates_clusters() {
        let (x, y) = separable_data();
        let mut svm = SvmClassifier::new(SvmConfig::rbf_for_features(2));
        svm.fit(&x, &y).unwrap();

        let preds = svm.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count();
        assert!(correct as f64 / y.len() as f64 > 0.9);
    }

    #[test]
    fn test_linear_kernel() {
        let (x, y) = separable_data();
        let mut svm = SvmClassifier::new(SvmConfig {
            kernel: KernelType::Linear,
            ..Default::default()
        });
        svm.fit(&x, &y).unwrap();

        let preds = svm.predict(&x).unwrap();
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| (*p - *t).abs() < 0.5)
            .count();
        assert!(correct as f64 / y.len() as f64 > 0.9);
    }

    #[test]
    fn test_proba_monotone_in_decision_value() {
        let (x, y) = separable_data();
        let mut svm = SvmClassifier::new(SvmConfig::rbf_for_features(2));
        svm.fit(&x, &y).unwrap();

        let decision = svm.decision_function(&x).unwrap();
        let proba = svm.predict_proba(&x).unwrap();
        for (d, p) in decision.iter().zip(proba.iter()) {
            assert!((0.0..=1.0).contains(p));
            assert_eq!(*d >= 0.0, *p >= 0.5);
        }
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::from_shape_vec((3, 2), vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5]).unwrap();
        let y = Array1::from_vec(vec![1.0, 1.0, 1.0]);
        let mut svm = SvmClassifier::new(SvmConfig::default());
        assert!(svm.fit(&x, &y).is_err());
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let svm = SvmClassifier::new(SvmConfig::default());
        let (x, _) = separable_data();
        assert!(svm.predict(&x).is_err());
    }
}
