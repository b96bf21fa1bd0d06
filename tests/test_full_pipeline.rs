//! Integration test: train, save, reload, and predict like a deployment would

use polars::prelude::*;
use sonar_detect::artifact::ModelArtifact;
use sonar_detect::assessment::{ObjectClass, BAND_COUNT};
use sonar_detect::inference::InferenceEngine;
use sonar_detect::training::{ModelType, TrainEngine, TrainingConfig};

fn sonar_like_df(n_per_class: usize) -> DataFrame {
    let n = n_per_class * 2;
    let mut columns: Vec<Column> = Vec::with_capacity(BAND_COUNT + 1);

    for band in 0..BAND_COUNT {
        let values: Vec<f64> = (0..n)
            .map(|i| {
                let is_mine = i % 2 == 1;
                let jitter = (i as f64 * 0.9 + band as f64 * 0.4).sin().abs() * 0.05;
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

#[test]
fn test_train_save_reload_predict() {
    let df = sonar_like_df(12);

    // Train the winner among a fast candidate set
    let base = TrainingConfig::default().with_cv(3).with_n_estimators(15);
    let candidates = [
        ModelType::LogisticRegression,
        ModelType::RandomForest,
        ModelType::NaiveBayes,
    ];
    let (best, table) = TrainEngine::select_best(&df, &base, &candidates).unwrap();
    assert_eq!(table.len(), 3);

    // Bundle and save both artifacts the way the train command does
    let dir = std::env::temp_dir().join(format!("sonar-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let model_path = dir.join("sonar_model.json");
    let backup_path = dir.join("sonar_backup_model.json");

    let name = best.config().model_type.name().to_string();
    ModelArtifact::from_engine(&name, best).unwrap().save(&model_path).unwrap();

    let mut backup = TrainEngine::new(TrainingConfig {
        model_type: ModelType::LogisticRegression,
        ..base
    });
    backup.fit(&df).unwrap();
    ModelArtifact::from_engine("Logistic Regression", backup)
        .unwrap()
        .save(&backup_path)
        .unwrap();

    // Reload from disk and predict like the server does
    let engine = InferenceEngine::load(&model_path, Some(&backup_path)).unwrap();
    assert!(engine.has_backup());

    let rock: Vec<f64> = (0..BAND_COUNT)
        .map(|band| if band < 20 { 0.7 } else { 0.2 })
        .collect();
    let mine: Vec<f64> = (0..BAND_COUNT)
        .map(|band| if band >= 40 { 0.7 } else { 0.2 })
        .collect();

    let rock_report = engine.predict(&rock).unwrap();
    assert_eq!(rock_report.assessment.object_class, ObjectClass::Rock);

    let mine_report = engine.predict(&mine).unwrap();
    assert_eq!(mine_report.assessment.object_class, ObjectClass::Mine);

    // Probabilities always describe both classes
    let a = &mine_report.assessment;
    assert!((a.rock_probability + a.mine_probability - 100.0).abs() < 1e-6);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_artifact_rejects_wrong_band_count() {
    // An artifact trained on a non-sonar frame must not load for serving
    let df = df!(
        "a" => &[0.1, 0.9, 0.2, 0.8, 0.15, 0.85],
        "b" => &[0.9, 0.1, 0.8, 0.2, 0.85, 0.15],
        "label" => &[0.0, 1.0, 0.0, 1.0, 0.0, 1.0],
    )
    .unwrap();

    let mut engine = TrainEngine::new(
        TrainingConfig::new(ModelType::NaiveBayes)
            .with_cv(0),
    );
    engine.fit(&df).unwrap();

    let path = std::env::temp_dir().join(format!("sonar-narrow-{}.json", std::process::id()));
    ModelArtifact::from_engine("Naive Bayes", engine)
        .unwrap()
        .save(&path)
        .unwrap();

    let result = ModelArtifact::load(&path);
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
}
