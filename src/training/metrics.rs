//! Classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Metrics for binary classifier evaluation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Rank-based AUC over mine-class probabilities (None without probabilities)
    pub roc_auc: Option<f64>,
    /// Log loss over mine-class probabilities (None without probabilities)
    pub log_loss: Option<f64>,
    /// Training time in seconds
    pub training_time_secs: f64,
    /// Number of features
    pub n_features: usize,
    /// Number of evaluation samples
    pub n_samples: usize,
}

impl ClassificationMetrics {
    /// Compute metrics from labels, predictions, and optional mine-class
    /// probabilities.
    pub fn compute(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        y_prob: Option<&Array1<f64>>,
    ) -> Self {
        let mut metrics = Self {
            n_samples: y_true.len(),
            ..Default::default()
        };

        if y_true.is_empty() {
            return metrics;
        }

        let correct: usize = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        metrics.accuracy = correct as f64 / y_true.len() as f64;

        let (tp, fp, _tn, fn_) = confusion_counts(y_true, y_pred);

        metrics.precision = if tp + fp > 0 {
            tp as f64 / (tp + fp) as f64
        } else {
            0.0
        };

        metrics.recall = if tp + fn_ > 0 {
            tp as f64 / (tp + fn_) as f64
        } else {
            0.0
        };

        metrics.f1_score = if metrics.precision + metrics.recall > 0.0 {
            2.0 * metrics.precision * metrics.recall / (metrics.precision + metrics.recall)
        } else {
            0.0
        };

        if let Some(probs) = y_prob {
            metrics.roc_auc = roc_auc(y_true, probs);
            metrics.log_loss = Some(log_loss(y_true, probs));
        }

        metrics
    }
}

/// Confusion matrix counts: (tp, fp, tn, fn) with mine (1) as the positive class
pub fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut tn = 0;
    let mut fn_ = 0;

    for (t, p) in y_true.iter().zip(y_pred.iter()) {
        match (*t > 0.5, *p > 0.5) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (false, false) => tn += 1,
            (true, false) => fn_ += 1,
        }
    }

    (tp, fp, tn, fn_)
}

/// ROC-AUC via the rank-sum (Mann-Whitney U) formulation with average ranks
/// for tied scores. Returns None when only one class is present.
pub fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Option<f64> {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v > 0.5).count();
    let n_neg = n - n_pos;

    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Assign average ranks across tie groups (1-based ranks)
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && (y_score[order[j + 1]] - y_score[order[i]]).abs() < f64::EPSILON {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}

/// Binary cross-entropy over mine-class probabilities, clamped away from 0/1
pub fn log_loss(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> f64 {
    const EPS: f64 = 1e-15;
    let n = y_true.len() as f64;

    let total: f64 = y_true
        .iter()
        .zip(y_prob.iter())
        .map(|(&t, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            if t > 0.5 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();

    total / n
}

/// Aggregated cross-validation results for one model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CvResults {
    pub n_folds: usize,
    pub fold_accuracies: Vec<f64>,
    pub accuracy_mean: f64,
    pub accuracy_std: f64,
    pub f1_mean: f64,
    pub roc_auc_mean: Option<f64>,
}

impl CvResults {
    /// Aggregate per-fold metrics
    pub fn from_folds(folds: &[ClassificationMetrics]) -> Self {
        let n = folds.len();
        let fold_accuracies: Vec<f64> = folds.iter().map(|m| m.accuracy).collect();

        let accuracy_mean = mean(&fold_accuracies);
        let accuracy_std = std_dev(&fold_accuracies, accuracy_mean);
        let f1_mean = mean(&folds.iter().map(|m| m.f1_score).collect::<Vec<_>>());

        let aucs: Vec<f64> = folds.iter().filter_map(|m| m.roc_auc).collect();
        let roc_auc_mean = if aucs.is_empty() {
            None
        } else {
            Some(mean(&aucs))
        };

        Self {
            n_folds: n,
            fold_accuracies,
            accuracy_mean,
            accuracy_std,
            f1_mean,
            roc_auc_mean,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy_and_f1() {
        let y_true = array![1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];

        let metrics = ClassificationMetrics::compute(&y_true, &y_pred, None);
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        assert!(metrics.precision > 0.0);
        assert!(metrics.recall > 0.0);
        assert!(metrics.f1_score > 0.0);
        assert!(metrics.roc_auc.is_none());
    }

    #[test]
    fn test_perfect_auc() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let y_score = array![0.1, 0.2, 0.8, 0.9];
        let auc = roc_auc(&y_true, &y_score).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_random_auc() {
        // All scores tied: AUC must be exactly 0.5
        let y_true = array![0.0, 1.0, 0.0, 1.0];
        let y_score = array![0.5, 0.5, 0.5, 0.5];
        let auc = roc_auc(&y_true, &y_score).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_auc_single_class_is_none() {
        let y_true = array![1.0, 1.0, 1.0];
        let y_score = array![0.5, 0.6, 0.7];
        assert!(roc_auc(&y_true, &y_score).is_none());
    }

    #[test]
    fn test_log_loss_confident_correct_is_small() {
        let y_true = array![1.0, 0.0];
        let y_prob = array![0.99, 0.01];
        assert!(log_loss(&y_true, &y_prob) < 0.05);

        let y_bad = array![0.01, 0.99];
        assert!(log_loss(&y_true, &y_bad) > 1.0);
    }

    #[test]
    fn test_cv_results_aggregation() {
        let folds: Vec<ClassificationMetrics> = [0.8, 0.9, 1.0]
            .iter()
            .map(|&acc| ClassificationMetrics {
                accuracy: acc,
                f1_score: acc,
                roc_auc: Some(acc),
                ..Default::default()
            })
            .collect();

        let cv = CvResults::from_folds(&folds);
        assert_eq!(cv.n_folds, 3);
        assert!((cv.accuracy_mean - 0.9).abs() < 1e-12);
        assert!(cv.accuracy_std > 0.0);
        assert_eq!(cv.roc_auc_mean, Some(0.9));
    }
}
