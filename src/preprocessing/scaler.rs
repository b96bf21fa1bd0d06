//! Feature scaling implementations

use crate::error::{Result, SonarError};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Type of scaler to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalerKind {
    /// Standard scaling (z-score normalization): (x - mean) / std
    Standard,
    /// Min-Max scaling: (x - min) / (max - min)
    MinMax,
    /// Robust scaling using median and IQR
    Robust,
    /// No scaling
    None,
}

impl Default for ScalerKind {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::str::FromStr for ScalerKind {
    type Err = SonarError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "standard" => Ok(Self::Standard),
            "minmax" => Ok(Self::MinMax),
            "robust" => Ok(Self::Robust),
            "none" => Ok(Self::None),
            other => Err(SonarError::InvalidInput(format!(
                "Unknown scaler: {} (expected standard, minmax, robust, none)",
                other
            ))),
        }
    }
}

/// Column-wise feature scaler over `Array2<f64>` matrices.
///
/// Fitted parameters (one center/scale pair per column) are serializable so
/// the scaler can travel inside a saved model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scaler {
    kind: ScalerKind,
    centers: Vec<f64>,
    scales: Vec<f64>,
    is_fitted: bool,
}

impl Scaler {
    /// Create a new scaler
    pub fn new(kind: ScalerKind) -> Self {
        Self {
            kind,
            centers: Vec::new(),
            scales: Vec::new(),
            is_fitted: false,
        }
    }

    /// Scaler kind
    pub fn kind(&self) -> ScalerKind {
        self.kind
    }

    /// Number of columns the scaler was fitted on
    pub fn n_features(&self) -> usize {
        self.centers.len()
    }

    /// Fit the scaler to the data
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(SonarError::PreprocessingError(
                "Cannot fit scaler on an empty matrix".to_string(),
            ));
        }

        let n_cols = x.ncols();
        self.centers = Vec::with_capacity(n_cols);
        self.scales = Vec::with_capacity(n_cols);

        for col in x.columns() {
            let (center, scale) = self.compute_params(col);
            self.centers.push(center);
            // Zero-spread columns pass through unchanged
            self.scales.push(if scale == 0.0 { 1.0 } else { scale });
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform a feature matrix
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(SonarError::ModelNotFitted);
        }
        if x.ncols() != self.centers.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} columns", self.centers.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (j, mut col) in out.columns_mut().into_iter().enumerate() {
            let center = self.centers[j];
            let scale = self.scales[j];
            col.mapv_inplace(|v| (v - center) / scale);
        }
        Ok(out)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Transform a single feature row (used by the inference path)
    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        if !self.is_fitted {
            return Err(SonarError::ModelNotFitted);
        }
        if row.len() != self.centers.len() {
            return Err(SonarError::ShapeError {
                expected: format!("{} values", self.centers.len()),
                actual: format!("{} values", row.len()),
            });
        }

        Ok(row
            .iter()
            .zip(self.centers.iter().zip(self.scales.iter()))
            .map(|(&v, (&center, &scale))| (v - center) / scale)
            .collect())
    }

    fn compute_params(&self, col: ArrayView1<'_, f64>) -> (f64, f64) {
        match self.kind {
            ScalerKind::Standard => {
                let mean = col.mean().unwrap_or(0.0);
                let n = col.len() as f64;
                let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / (n - 1.0).max(1.0);
                (mean, var.sqrt())
            }
            ScalerKind::MinMax => {
                let min = col.iter().copied().fold(f64::INFINITY, f64::min);
                let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                (min, max - min)
            }
            ScalerKind::Robust => {
                let median = percentile(col, 0.5);
                let q1 = percentile(col, 0.25);
                let q3 = percentile(col, 0.75);
                (median, q3 - q1)
            }
            ScalerKind::None => (0.0, 1.0),
        }
    }
}

/// Linear-interpolated percentile of a column view
fn percentile(col: ArrayView1<'_, f64>, q: f64) -> f64 {
    let mut values: Vec<f64> = col.iter().copied().collect();
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if values.is_empty() {
        return 0.0;
    }

    let pos = q * (values.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        values[lo]
    } else {
        let frac = pos - lo as f64;
        values[lo] * (1.0 - frac) + values[hi] * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0], [5.0, 50.0]];

        let mut scaler = Scaler::new(ScalerKind::Standard);
        let scaled = scaler.fit_transform(&x).unwrap();

        for j in 0..2 {
            let col = scaled.column(j);
            let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-10, "column {} mean should be ~0", j);
        }
    }

    #[test]
    fn test_minmax_scaler() {
        let x = array![[0.0], [5.0], [10.0]];

        let mut scaler = Scaler::new(ScalerKind::MinMax);
        let scaled = scaler.fit_transform(&x).unwrap();

        assert!((scaled[[0, 0]] - 0.0).abs() < 1e-12);
        assert!((scaled[[1, 0]] - 0.5).abs() < 1e-12);
        assert!((scaled[[2, 0]] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_variance_column() {
        let x = array![[3.0], [3.0], [3.0]];

        let mut scaler = Scaler::new(ScalerKind::Standard);
        let scaled = scaler.fit_transform(&x).unwrap();

        // Scale falls back to 1.0, so output is centered but finite
        for v in scaled.iter() {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_transform_row_matches_matrix() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        let mut scaler = Scaler::new(ScalerKind::Standard);
        let scaled = scaler.fit_transform(&x).unwrap();

        let row = scaler.transform_row(&[3.0, 4.0]).unwrap();
        assert!((row[0] - scaled[[1, 0]]).abs() < 1e-12);
        assert!((row[1] - scaled[[1, 1]]).abs() < 1e-12);
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let scaler = Scaler::new(ScalerKind::Standard);
        let x = array![[1.0]];
        assert!(scaler.transform(&x).is_err());
    }

    #[test]
    fn test_width_mismatch_errors() {
        let mut scaler = Scaler::new(ScalerKind::Standard);
        scaler.fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert!(scaler.transform(&array![[1.0]]).is_err());
    }
}
