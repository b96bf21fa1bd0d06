//! Integration test: training pipeline end-to-end

use polars::prelude::*;
use sonar_detect::assessment::BAND_COUNT;
use sonar_detect::training::{ModelType, TrainEngine, TrainingConfig};

/// Synthetic 60-band frame with the rock/mine band-group structure:
/// rocks concentrate energy in low bands, mines in high bands.
fn sonar_like_df(n_per_class: usize) -> DataFrame {
    let n = n_per_class * 2;
    let mut columns: Vec<Column> = Vec::with_capacity(BAND_COUNT + 1);

    for band in 0..BAND_COUNT {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let is_mine = i % 2 == 1;
                let jitter = (i as f64 * 1.3 + band as f64 * 0.7).sin().abs() * 0.05;
                if (is_mine && band >= 40) || (!is_mine && band < 20) {
                    0.7 + jitter
                } else {
                    0.2 + jitter
                }
            })
            .collect();
        columns.push(Series::new(format!("band_{}", band).into(), values).into());
    }

    let labels: Vec<f64> = (0..n).map(|i| if i % 2 == 1 { 1.0 } else { 0.0 }).collect();
    columns.push(Series::new("label".into(), labels).into());

    DataFrame::new(columns).unwrap()
}

fn quick_config(model_type: ModelType) -> TrainingConfig {
    TrainingConfig::new(model_type)
        .with_cv(0)
        .with_n_estimators(15)
}

#[test]
fn test_train_logistic_regression() {
    let df = sonar_like_df(15);
    let mut engine = TrainEngine::new(quick_config(ModelType::LogisticRegression));
    let result = engine.fit(&df);
    assert!(result.is_ok(), "logistic training failed: {:?}", result.err());
    assert!(engine.metrics().unwrap().accuracy > 0.8);
}

#[test]
fn test_train_random_forest() {
    let df = sonar_like_df(15);
    let mut engine = TrainEngine::new(quick_config(ModelType::RandomForest));
    let result = engine.fit(&df);
    assert!(result.is_ok(), "forest training failed: {:?}", result.err());
    assert!(engine.metrics().unwrap().accuracy > 0.8);
}

#[test]
fn test_train_svm() {
    let df = sonar_like_df(15);
    let mut engine = TrainEngine::new(quick_config(ModelType::Svm));
    let result = engine.fit(&df);
    assert!(result.is_ok(), "SVM training failed: {:?}", result.err());
}

#[test]
fn test_train_gradient_boosting() {
    let df = sonar_like_df(15);
    let mut engine = TrainEngine::new(quick_config(ModelType::GradientBoosting));
    let result = engine.fit(&df);
    assert!(result.is_ok(), "boosting training failed: {:?}", result.err());
    assert!(engine.metrics().unwrap().accuracy > 0.8);
}

#[test]
fn test_train_knn() {
    let df = sonar_like_df(15);
    let mut engine = TrainEngine::new(quick_config(ModelType::Knn));
    let result = engine.fit(&df);
    assert!(result.is_ok(), "KNN training failed: {:?}", result.err());
    assert!(engine.metrics().unwrap().accuracy > 0.8);
}

#[test]
fn test_train_naive_bayes() {
    let df = sonar_like_df(15);
    let mut engine = TrainEngine::new(quick_config(ModelType::NaiveBayes));
    let result = engine.fit(&df);
    assert!(result.is_ok(), "naive Bayes training failed: {:?}", result.err());
    assert!(engine.metrics().unwrap().accuracy > 0.8);
}

#[test]
fn test_cross_validation_summary() {
    let df = sonar_like_df(15);
    let config = TrainingConfig::new(ModelType::NaiveBayes).with_cv(3);
    let mut engine = TrainEngine::new(config);
    engine.fit(&df).unwrap();

    let cv = engine.cv_results().expect("CV results should be present");
    assert_eq!(cv.n_folds, 3);
    assert_eq!(cv.fold_accuracies.len(), 3);
    assert!(cv.accuracy_mean > 0.7);
}

#[test]
fn test_probabilities_well_formed() {
    let df = sonar_like_df(15);
    for model_type in ModelType::ALL {
        let mut engine = TrainEngine::new(quick_config(model_type));
        engine.fit(&df).unwrap();

        let proba = engine.predict_proba(&df).unwrap();
        assert_eq!(proba.ncols(), 2, "{:?}", model_type);
        for row in proba.rows() {
            let sum: f64 = row.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "{:?}: probability row sums to {}",
                model_type,
                sum
            );
            for p in row.iter() {
                assert!((0.0..=1.0).contains(p), "{:?}: probability {}", model_type, p);
            }
        }
    }
}

#[test]
fn test_select_best_trains_all_and_ranks() {
    let df = sonar_like_df(12);
    let base = TrainingConfig::default().with_cv(3).with_n_estimators(10);

    let (best, table) = TrainEngine::select_best(&df, &base, &ModelType::ALL).unwrap();

    assert!(best.is_fitted());
    assert_eq!(table.len(), ModelType::ALL.len());
    for pair in table.windows(2) {
        assert!(pair[0].selection_score() >= pair[1].selection_score());
    }
    assert_eq!(best.config().model_type, table[0].model_type);
}

#[test]
fn test_seeded_training_is_reproducible() {
    let df = sonar_like_df(12);
    let run = || {
        let config = quick_config(ModelType::RandomForest).with_random_state(7);
        let mut engine = TrainEngine::new(config);
        engine.fit(&df).unwrap();
        engine.predict_proba(&df).unwrap()
    };

    let a = run();
    let b = run();
    for (pa, pb) in a.iter().zip(b.iter()) {
        assert!((pa - pb).abs() < 1e-12);
    }
}
