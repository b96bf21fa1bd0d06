//! Gaussian naive Bayes classifier

use crate::error::{Result, SonarError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Per-class Gaussian statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassStats {
    prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

/// Gaussian naive Bayes for the binary rock/mine task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianNaiveBayes {
    rock: Option<ClassStats>,
    mine: Option<ClassStats>,
    /// Variance smoothing added to every feature variance
    var_smoothing: f64,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNaiveBayes {
    pub fn new() -> Self {
        Self {
            rock: None,
            mine: None,
            var_smoothing: 1e-9,
        }
    }

    pub fn with_var_smoothing(mut self, smoothing: f64) -> Self {
        self.var_smoothing = smoothing;
        self
    }

    /// Fit per-class feature means and variances (single-pass Welford)
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }

        let rock_indices: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &v)| v < 0.5)
            .map(|(i, _)| i)
            .collect();
        let mine_indices: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= 0.5)
            .map(|(i, _)| i)
            .collect();

        if rock_indices.is_empty() || mine_indices.is_empty() {
            return Err(SonarError::TrainingError(
                "Training data must contain both rock and mine samples".to_string(),
            ));
        }

        self.rock = Some(self.class_stats(x, &rock_indices, n_samples));
        self.mine = Some(self.class_stats(x, &mine_indices, n_samples));

        Ok(())
    }

    fn class_stats(&self, x: &Array2<f64>, indices: &[usize], n_total: usize) -> ClassStats {
        let n_features = x.ncols();
        let mut means = vec![0.0; n_features];
        let mut m2 = vec![0.0; n_features];
        let mut count = 0usize;

        for &idx in indices {
            count += 1;
            let row = x.row(idx);
            for (j, &val) in row.iter().enumerate() {
                let delta = val - means[j];
                means[j] += delta / count as f64;
                let delta2 = val - means[j];
                m2[j] += delta * delta2;
            }
        }

        let variances: Vec<f64> = m2
            .iter()
            .map(|&v| v / count as f64 + self.var_smoothing)
            .collect();

        ClassStats {
            prior: count as f64 / n_total as f64,
            means,
            variances,
        }
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Mine-class probabilities via normalized joint log-likelihoods
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let rock = self.rock.as_ref().ok_or(SonarError::ModelNotFitted)?;
        let mine = self.mine.as_ref().ok_or(SonarError::ModelNotFitted)?;

        if x.ncols() != rock.means.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} columns", rock.means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let probs: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let log_rock = rock.prior.ln() + log_likelihood(&row, rock);
                let log_mine = mine.prior.ln() + log_likelihood(&row, mine);

                // Normalize with the log-sum-exp trick
                let max = log_rock.max(log_mine);
                let denom = (log_rock - max).exp() + (log_mine - max).exp();
                (log_mine - max).exp() / denom
            })
            .collect();

        Ok(Array1::from_vec(probs))
    }
}

fn log_likelihood(row: &ndarray::ArrayView1<'_, f64>, stats: &ClassStats) -> f64 {
    row.iter()
        .zip(stats.means.iter().zip(stats.variances.iter()))
        .map(|(&xi, (&mean, &var))| -0.5 * ((xi - mean).powi(2) / var + var.ln() + (2.0 * PI).ln()))
        .sum()
}
