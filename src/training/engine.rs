//! Training engine: scale -> classifier pipelines with evaluation and selection

use crate::error::{Result, SonarError};
use crate::preprocessing::Scaler;
use super::cross_validation::{CrossValidator, CvStrategy};
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::knn::{KnnClassifier, KnnConfig};
use super::linear::LogisticRegression;
use super::metrics::{ClassificationMetrics, CvResults};
use super::naive_bayes::GaussianNaiveBayes;
use super::random_forest::RandomForestClassifier;
use super::svm::{SvmClassifier, SvmConfig};
use super::{ModelType, TrainingConfig};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;

/// A fitted classifier of any supported family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedClassifier {
    LogisticRegression(LogisticRegression),
    RandomForest(RandomForestClassifier),
    Svm(SvmClassifier),
    GradientBoosting(GradientBoostingClassifier),
    Knn(KnnClassifier),
    NaiveBayes(GaussianNaiveBayes),
}

impl TrainedClassifier {
    /// Predicted labels (0 = rock, 1 = mine)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::LogisticRegression(m) => m.predict(x),
            Self::RandomForest(m) => m.predict(x),
            Self::Svm(m) => m.predict(x),
            Self::GradientBoosting(m) => m.predict(x),
            Self::Knn(m) => m.predict(x),
            Self::NaiveBayes(m) => m.predict(x),
        }
    }

    /// Mine-class probability per row
    pub fn predict_mine_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Self::LogisticRegression(m) => m.predict_proba(x),
            Self::RandomForest(m) => m.predict_proba(x),
            Self::Svm(m) => m.predict_proba(x),
            Self::GradientBoosting(m) => m.predict_proba(x),
            Self::Knn(m) => m.predict_proba(x),
            Self::NaiveBayes(m) => m.predict_proba(x),
        }
    }

    /// Per-band importances where the family supports them
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            Self::RandomForest(m) => m.feature_importances().cloned(),
            Self::GradientBoosting(m) => {
                Some(Array1::from_vec(m.feature_importances().to_vec()))
            }
            Self::LogisticRegression(m) => m.coefficients.as_ref().map(|c| c.mapv(f64::abs)),
            // Distance- and likelihood-based families carry no importances
            Self::Svm(_) | Self::Knn(_) | Self::NaiveBayes(_) => None,
        }
    }
}

/// One row of a model comparison table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelComparison {
    pub model_type: ModelType,
    pub model_name: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub roc_auc: Option<f64>,
    pub cv_accuracy_mean: Option<f64>,
    pub cv_accuracy_std: Option<f64>,
    pub training_time_secs: f64,
}

impl ModelComparison {
    /// Score used to rank models: CV accuracy when available, holdout otherwise
    pub fn selection_score(&self) -> f64 {
        self.cv_accuracy_mean.unwrap_or(self.accuracy)
    }
}

/// Main training engine. Owns the fitted scaler and classifier along with the
/// evaluation results that produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainEngine {
    config: TrainingConfig,
    feature_names: Vec<String>,
    scaler: Option<Scaler>,
    model: Option<TrainedClassifier>,
    metrics: Option<ClassificationMetrics>,
    cv_results: Option<CvResults>,
    is_fitted: bool,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            feature_names: Vec::new(),
            scaler: None,
            model: None,
            metrics: None,
            cv_results: None,
            is_fitted: false,
        }
    }

    /// Fit the pipeline: holdout split, scale, train, evaluate, cross-validate
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();

        let (x, y) = self.prepare_data(df)?;
        let (train_idx, val_idx) = self.stratified_holdout(&y)?;

        let x_train = x.select(ndarray::Axis(0), &train_idx);
        let y_train = Array1::from_iter(train_idx.iter().map(|&i| y[i]));
        let x_val = x.select(ndarray::Axis(0), &val_idx);
        let y_val = Array1::from_iter(val_idx.iter().map(|&i| y[i]));

        // Scaler parameters come from the training rows only
        let mut scaler = Scaler::new(self.config.scaler);
        let x_train_scaled = scaler.fit_transform(&x_train)?;
        let x_val_scaled = scaler.transform(&x_val)?;
        self.scaler = Some(scaler);

        let model = train_model(&self.config, &x_train_scaled, &y_train)?;

        let y_pred = model.predict(&x_val_scaled)?;
        let y_prob = model.predict_mine_proba(&x_val_scaled)?;
        let mut metrics = ClassificationMetrics::compute(&y_val, &y_pred, Some(&y_prob));
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = x.ncols();

        self.model = Some(model);
        self.metrics = Some(metrics);
        self.is_fitted = true;

        if self.config.cv_folds > 0 {
            self.cv_results = Some(self.cross_validate(&x, &y)?);
        }

        Ok(self)
    }

    /// Stratified k-fold evaluation over the full dataset. Every fold refits
    /// the scaler and classifier from scratch on its training rows.
    fn cross_validate(&self, x: &Array2<f64>, y: &Array1<f64>) -> Result<CvResults> {
        let mut cv = CrossValidator::new(CvStrategy::StratifiedKFold {
            n_splits: self.config.cv_folds,
            shuffle: true,
        });
        if let Some(seed) = self.config.random_state {
            cv = cv.with_random_state(seed);
        }

        let splits = cv.split(x.nrows(), Some(y))?;
        let mut fold_metrics = Vec::with_capacity(splits.len());

        for split in &splits {
            let x_train = x.select(ndarray::Axis(0), &split.train_indices);
            let y_train = Array1::from_iter(split.train_indices.iter().map(|&i| y[i]));
            let x_test = x.select(ndarray::Axis(0), &split.test_indices);
            let y_test = Array1::from_iter(split.test_indices.iter().map(|&i| y[i]));

            let mut scaler = Scaler::new(self.config.scaler);
            let x_train_scaled = scaler.fit_transform(&x_train)?;
            let x_test_scaled = scaler.transform(&x_test)?;

            let model = train_model(&self.config, &x_train_scaled, &y_train)?;
            let y_pred = model.predict(&x_test_scaled)?;
            let y_prob = model.predict_mine_proba(&x_test_scaled)?;

            fold_metrics.push(ClassificationMetrics::compute(&y_test, &y_pred, Some(&y_prob)));
        }

        Ok(CvResults::from_folds(&fold_metrics))
    }

    /// Predict labels for a DataFrame of band columns
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = self.extract_features(df)?;
        self.predict_array(&x)
    }

    /// Predict labels for a raw feature matrix
    pub fn predict_array(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (model, scaler) = self.parts()?;
        let scaled = scaler.transform(x)?;
        model.predict(&scaled)
    }

    /// Class probabilities `(n, 2)` with columns `[rock, mine]`
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let x = self.extract_features(df)?;
        self.predict_proba_array(&x)
    }

    /// Class probabilities for a raw feature matrix
    pub fn predict_proba_array(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (model, scaler) = self.parts()?;
        let scaled = scaler.transform(x)?;
        let mine = model.predict_mine_proba(&scaled)?;

        let mut out = Array2::zeros((mine.len(), 2));
        for (i, &p) in mine.iter().enumerate() {
            out[[i, 0]] = 1.0 - p;
            out[[i, 1]] = p;
        }
        Ok(out)
    }

    fn parts(&self) -> Result<(&TrainedClassifier, &Scaler)> {
        if !self.is_fitted {
            return Err(SonarError::ModelNotFitted);
        }
        let model = self.model.as_ref().ok_or(SonarError::ModelNotFitted)?;
        let scaler = self.scaler.as_ref().ok_or(SonarError::ModelNotFitted)?;
        Ok((model, scaler))
    }

    /// Training configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Holdout metrics from the last fit
    pub fn metrics(&self) -> Option<&ClassificationMetrics> {
        self.metrics.as_ref()
    }

    /// Cross-validation results from the last fit
    pub fn cv_results(&self) -> Option<&CvResults> {
        self.cv_results.as_ref()
    }

    /// Feature names in training order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Whether `fit` has completed
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Per-band importances where the trained family supports them
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        self.model.as_ref()?.feature_importances()
    }

    /// Comparison row for this fitted engine
    pub fn comparison(&self) -> Option<ModelComparison> {
        let metrics = self.metrics.as_ref()?;
        Some(ModelComparison {
            model_type: self.config.model_type,
            model_name: self.config.model_type.name().to_string(),
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            f1_score: metrics.f1_score,
            roc_auc: metrics.roc_auc,
            cv_accuracy_mean: self.cv_results.as_ref().map(|cv| cv.accuracy_mean),
            cv_accuracy_std: self.cv_results.as_ref().map(|cv| cv.accuracy_std),
            training_time_secs: metrics.training_time_secs,
        })
    }

    /// Train every candidate family under a shared base config and return the
    /// best-scoring engine plus the full comparison table, ranked best-first.
    pub fn select_best(
        df: &DataFrame,
        base: &TrainingConfig,
        candidates: &[ModelType],
    ) -> Result<(TrainEngine, Vec<ModelComparison>)> {
        if candidates.is_empty() {
            return Err(SonarError::TrainingError(
                "No candidate model families given".to_string(),
            ));
        }

        let mut engines: Vec<TrainEngine> = Vec::with_capacity(candidates.len());
        for &model_type in candidates {
            let config = TrainingConfig {
                model_type,
                ..base.clone()
            };
            let mut engine = TrainEngine::new(config);
            engine.fit(df)?;
            engines.push(engine);
        }

        let mut comparisons: Vec<ModelComparison> =
            engines.iter().filter_map(|e| e.comparison()).collect();
        comparisons.sort_by(|a, b| {
            b.selection_score()
                .partial_cmp(&a.selection_score())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let best_type = comparisons[0].model_type;
        let best = engines
            .into_iter()
            .find(|e| e.config.model_type == best_type)
            .ok_or_else(|| SonarError::TrainingError("Best model disappeared".to_string()))?;

        Ok((best, comparisons))
    }

    /// Save the engine as JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load an engine from JSON
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let engine: Self = serde_json::from_str(&json)?;
        Ok(engine)
    }

    fn prepare_data(&mut self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        let feature_cols: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != self.config.target_column)
            .map(|s| s.to_string())
            .collect();

        if feature_cols.is_empty() {
            return Err(SonarError::DataError(
                "No feature columns besides the target".to_string(),
            ));
        }
        self.feature_names = feature_cols.clone();

        let target = df
            .column(&self.config.target_column)
            .map_err(|_| SonarError::FeatureNotFound(self.config.target_column.clone()))?;
        let target_f64 = target
            .cast(&DataType::Float64)
            .map_err(|e| SonarError::DataError(e.to_string()))?;
        let y: Array1<f64> = target_f64
            .f64()
            .map_err(|e| SonarError::DataError(e.to_string()))?
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();

        let x = columns_to_array2(df, &feature_cols)?;
        Ok((x, y))
    }

    fn extract_features(&self, df: &DataFrame) -> Result<Array2<f64>> {
        columns_to_array2(df, &self.feature_names)
    }

    /// Stratified holdout indices preserving class proportions, shuffled with
    /// the configured seed.
    fn stratified_holdout(&self, y: &Array1<f64>) -> Result<(Vec<usize>, Vec<usize>)> {
        let mut class_indices: HashMap<i64, Vec<usize>> = HashMap::new();
        for (i, &label) in y.iter().enumerate() {
            class_indices.entry(label.round() as i64).or_default().push(i);
        }

        let mut rng = match self.config.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        let mut train_indices = Vec::new();
        let mut val_indices = Vec::new();

        let mut classes: Vec<i64> = class_indices.keys().copied().collect();
        classes.sort_unstable();

        for class in classes {
            let mut indices = class_indices.remove(&class).unwrap_or_default();
            indices.shuffle(&mut rng);

            let val_size = ((indices.len() as f64) * self.config.validation_split)
                .max(1.0) as usize;
            let val_size = val_size.min(indices.len().saturating_sub(1));
            let split_point = indices.len() - val_size;

            train_indices.extend_from_slice(&indices[..split_point]);
            val_indices.extend_from_slice(&indices[split_point..]);
        }

        if train_indices.is_empty() || val_indices.is_empty() {
            return Err(SonarError::DataError(
                "Stratified split produced an empty train or validation set".to_string(),
            ));
        }

        Ok((train_indices, val_indices))
    }
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df
                .column(col_name)
                .map_err(|_| SonarError::FeatureNotFound(col_name.clone()))?;
            let column_f64 = column
                .cast(&DataType::Float64)
                .map_err(|e| SonarError::DataError(e.to_string()))?;
            let values: Vec<f64> = column_f64
                .f64()
                .map_err(|e| SonarError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

/// Dispatch one classifier family from the shared config
fn train_model(
    config: &TrainingConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<TrainedClassifier> {
    let model = match config.model_type {
        ModelType::LogisticRegression => {
            let mut model = LogisticRegression::new()
                .with_max_iter(config.max_iter)
                .with_learning_rate(config.learning_rate);
            model.fit(x, y)?;
            TrainedClassifier::LogisticRegression(model)
        }
        ModelType::RandomForest => {
            let mut model = RandomForestClassifier::new(config.n_estimators)
                .with_min_samples_split(config.min_samples_split)
                .with_min_samples_leaf(config.min_samples_leaf);
            if let Some(depth) = config.max_depth {
                model = model.with_max_depth(depth);
            }
            if let Some(seed) = config.random_state {
                model = model.with_random_state(seed);
            }
            model.fit(x, y)?;
            TrainedClassifier::RandomForest(model)
        }
        ModelType::Svm => {
            let svm_config = SvmConfig {
                c: config.svm_c,
                max_iter: config.max_iter,
                random_state: config.random_state,
                ..SvmConfig::rbf_for_features(x.ncols())
            };
            let mut model = SvmClassifier::new(svm_config);
            model.fit(x, y)?;
            TrainedClassifier::Svm(model)
        }
        ModelType::GradientBoosting => {
            let gb_config = GradientBoostingConfig {
                n_estimators: config.n_estimators,
                learning_rate: config.learning_rate,
                max_depth: config.max_depth.unwrap_or(5),
                min_samples_leaf: config.min_samples_leaf,
                random_state: config.random_state,
                ..Default::default()
            };
            let mut model = GradientBoostingClassifier::new(gb_config);
            model.fit(x, y)?;
            TrainedClassifier::GradientBoosting(model)
        }
        ModelType::Knn => {
            let knn_config = KnnConfig {
                n_neighbors: config.n_neighbors,
                ..Default::default()
            };
            let mut model = KnnClassifier::new(knn_config);
            model.fit(x, y)?;
            TrainedClassifier::Knn(model)
        }
        ModelType::NaiveBayes => {
            let mut model = GaussianNaiveBayes::new();
            model.fit(x, y)?;
            TrainedClassifier::NaiveBayes(model)
        }
    };

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_df(n_per_class: usize) -> DataFrame {
        let mut f1 = Vec::new();
        let mut f2 = Vec::new();
        let mut label = Vec::new();
        for i in 0..n_per_class {
            let jitter = i as f64 * 0.005;
            f1.push(0.2 + jitter);
            f2.push(0.8 - jitter);
            label.push(0.0);
            f1.push(0.8 - jitter);
            f2.push(0.2 + jitter);
            label.push(1.0);
        }
        df!(
            "band_a" => &f1,
            "band_b" => &f2,
            "label" => &label,
        )
        .unwrap()
    }

    #[test]
    fn test_fit_and_predict() {
        let df = classification_df(20);
        let config = TrainingConfig::new(ModelType::LogisticRegression).with_cv(0);
        let mut engine = TrainEngine::new(config);
        engine.fit(&df).unwrap();

        assert!(engine.is_fitted());
        assert!(engine.metrics().is_some());

        let preds = engine.predict(&df).unwrap();
        assert_eq!(preds.len(), 40);
    }

    #[test]
    fn test_proba_columns_sum_to_one() {
        let df = classification_df(20);
        let config = TrainingConfig::new(ModelType::RandomForest)
            .with_n_estimators(10)
            .with_cv(0);
        let mut engine = TrainEngine::new(config);
        engine.fit(&df).unwrap();

        let proba = engine.predict_proba(&df).unwrap();
        assert_eq!(proba.ncols(), 2);
        for row in proba.rows() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cross_validation_runs() {
        let df = classification_df(15);
        let config = TrainingConfig::new(ModelType::NaiveBayes).with_cv(3);
        let mut engine = TrainEngine::new(config);
        engine.fit(&df).unwrap();

        let cv = engine.cv_results().unwrap();
        assert_eq!(cv.n_folds, 3);
        assert!(cv.accuracy_mean > 0.5);
    }

    #[test]
    fn test_select_best_returns_ranked_table() {
        let df = classification_df(15);
        let base = TrainingConfig::default().with_cv(3).with_n_estimators(10);
        let candidates = [ModelType::LogisticRegression, ModelType::NaiveBayes];

        let (best, table) = TrainEngine::select_best(&df, &base, &candidates).unwrap();
        assert!(best.is_fitted());
        assert_eq!(table.len(), 2);
        assert!(table[0].selection_score() >= table[1].selection_score());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let df = classification_df(15);
        let config = TrainingConfig::new(ModelType::LogisticRegression).with_cv(0);
        let mut engine = TrainEngine::new(config);
        engine.fit(&df).unwrap();

        let path = std::env::temp_dir().join("sonar-engine-roundtrip.json");
        engine.save(path.to_str().unwrap()).unwrap();
        let loaded = TrainEngine::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();

        let a = engine.predict(&df).unwrap();
        let b = loaded.predict(&df).unwrap();
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert!((pa - pb).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_target_column_errors() {
        let df = df!("band_a" => &[0.1, 0.2]).unwrap();
        let config = TrainingConfig::new(ModelType::NaiveBayes).with_target("nope");
        let mut engine = TrainEngine::new(config);
        assert!(engine.fit(&df).is_err());
    }
}
