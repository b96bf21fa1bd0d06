//! Command-line interface
//!
//! Training, comparison, batch prediction, dataset inspection, and the server.

use clap::{Parser, Subcommand};
use colored::*;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::ModelArtifact;
use crate::assessment::BAND_COUNT;
use crate::inference::InferenceEngine;
use crate::preprocessing::ScalerKind;
use crate::server::{run_server, ServerConfig};
use crate::training::{ModelComparison, ModelType, TrainEngine, TrainingConfig};
use crate::utils::{load_sonar_csv, DatasetSummary};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

fn muted(s: &str) -> ColoredString {
    s.truecolor(140, 140, 140)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "sonar-detect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SONAR rock-vs-mine classification")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model (or pick the best family) and save the artifact
    Train {
        /// Sonar CSV file (60 band columns + R/M label)
        #[arg(short, long)]
        data: PathBuf,

        /// Model family, or "best" to train all and keep the winner
        #[arg(short, long, default_value = "best")]
        model: String,

        /// Scaler (standard, minmax, robust, none)
        #[arg(long, default_value = "standard")]
        scaler: String,

        /// Number of stratified cross-validation folds (0 disables CV)
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output artifact path
        #[arg(short, long, default_value = "models/sonar_model.json")]
        output: PathBuf,

        /// Also save a logistic regression backup artifact here
        #[arg(long)]
        backup_output: Option<PathBuf>,
    },

    /// Train every family and print the comparison table
    Compare {
        /// Sonar CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Number of stratified cross-validation folds
        #[arg(long, default_value = "5")]
        cv_folds: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Classify readings from a CSV of 60-band rows
    Predict {
        /// Trained model artifact
        #[arg(short, long)]
        model: PathBuf,

        /// CSV with one 60-band reading per row (no label column)
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Show dataset information
    Info {
        /// Sonar CSV file
        #[arg(short, long)]
        data: PathBuf,
    },

    /// Start the prediction server
    Serve {
        /// Server port
        #[arg(short, long, default_value = "5000")]
        port: u16,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Model artifact path
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Backup model artifact path
        #[arg(long)]
        backup_model: Option<PathBuf>,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    model: &str,
    scaler: &str,
    cv_folds: usize,
    seed: u64,
    output: &Path,
    backup_output: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading data");
    let start = Instant::now();
    let df = load_sonar_csv(data_path)?;
    step_done(&format!(
        "{} rows × {} cols in {:?}",
        df.height(),
        df.width(),
        start.elapsed()
    ));

    let base = TrainingConfig::default()
        .with_scaler(scaler.parse::<ScalerKind>()?)
        .with_cv(cv_folds)
        .with_random_state(seed);

    let engine = if model == "best" {
        step_run("Training all families");
        let start = Instant::now();
        let (best, table) = TrainEngine::select_best(&df, &base, &ModelType::ALL)?;
        step_done(&format!("{:?}", start.elapsed()));

        print_comparison_table(&table);
        best
    } else {
        let model_type: ModelType = model.parse()?;
        let config = TrainingConfig {
            model_type,
            ..base.clone()
        };

        step_run(&format!("Training {}", model_type.name().cyan()));
        let start = Instant::now();
        let mut engine = TrainEngine::new(config);
        engine.fit(&df)?;
        step_done(&format!("{:?}", start.elapsed()));

        print_engine_metrics(&engine);
        engine
    };

    let name = engine.config().model_type.name().to_string();
    step_run(&format!("Saving artifact → {}", output.display()));
    ModelArtifact::from_engine(&name, engine)?.save(output)?;
    step_done("");

    if let Some(backup_path) = backup_output {
        let config = TrainingConfig {
            model_type: ModelType::LogisticRegression,
            ..base
        };
        step_run("Training logistic regression backup");
        let mut backup = TrainEngine::new(config);
        backup.fit(&df)?;
        step_done("");

        step_run(&format!("Saving backup → {}", backup_path.display()));
        ModelArtifact::from_engine(ModelType::LogisticRegression.name(), backup)?
            .save(backup_path)?;
        step_done("");
    }

    println!();
    Ok(())
}

pub fn cmd_compare(data_path: &Path, cv_folds: usize, seed: u64) -> anyhow::Result<()> {
    section("Compare");

    step_run("Loading data");
    let df = load_sonar_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    step_run("Training all families");
    let start = Instant::now();
    let (_, table) = TrainEngine::select_best(
        &df,
        &TrainingConfig::default().with_cv(cv_folds).with_random_state(seed),
        &ModelType::ALL,
    )?;
    step_done(&format!("{:?}", start.elapsed()));

    print_comparison_table(&table);
    println!();
    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let engine = InferenceEngine::load(model_path, None)?;
    step_done(engine.model_name());

    step_run("Loading readings");
    let readings = load_band_rows(data_path)?;
    step_done(&format!("{} rows", readings.nrows()));

    println!();
    println!(
        "  {:<6} {:<8} {:>12} {:<14}",
        muted("Row"),
        muted("Object"),
        muted("Confidence"),
        muted("Risk")
    );
    println!("  {}", dim(&"─".repeat(46)));

    for (i, row) in readings.rows().into_iter().enumerate() {
        let bands: Vec<f64> = row.iter().copied().collect();
        match engine.predict(&bands) {
            Ok(report) => {
                let a = &report.assessment;
                println!(
                    "  {:<6} {:<8} {:>11.2}% {:<14}",
                    i,
                    a.object_class.as_str(),
                    a.confidence_percent,
                    a.risk_level.as_str()
                );
            }
            Err(e) => {
                println!("  {:<6} {}", i, format!("err: {}", e).red());
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = load_sonar_csv(data_path)?;
    let summary = DatasetSummary::from_frame(&df)?;

    println!("  {:<12} {}", muted("File"), data_path.display());
    println!("  {:<12} {}", muted("Rows"), summary.rows);
    println!("  {:<12} {}", muted("Bands"), summary.bands);
    println!(
        "  {:<12} {} ({:.1}%)",
        muted("Rocks"),
        summary.rocks,
        summary.rocks as f64 / summary.rows.max(1) as f64 * 100.0
    );
    println!(
        "  {:<12} {} ({:.1}%)",
        muted("Mines"),
        summary.mines,
        summary.mines as f64 / summary.rows.max(1) as f64 * 100.0
    );
    println!();
    Ok(())
}

pub async fn cmd_serve(
    host: &str,
    port: u16,
    model: Option<PathBuf>,
    backup_model: Option<PathBuf>,
) -> anyhow::Result<()> {
    let mut config = ServerConfig {
        host: host.to_string(),
        port,
        ..Default::default()
    };
    if let Some(path) = model {
        config.model_path = path;
    }
    if let Some(path) = backup_model {
        config.backup_model_path = Some(path);
    }

    run_server(config).await
}

// ─── Output helpers ────────────────────────────────────────────────────────────

fn print_comparison_table(table: &[ModelComparison]) {
    println!();
    println!(
        "  {:<22} {:>9} {:>9} {:>9} {:>9} {:>12}",
        muted("Model"),
        muted("Acc"),
        muted("F1"),
        muted("AUC"),
        muted("CV Acc"),
        muted("Time")
    );
    println!("  {}", dim(&"─".repeat(74)));

    for row in table {
        let auc = row
            .roc_auc
            .map(|v| format!("{:.4}", v))
            .unwrap_or_else(|| "-".to_string());
        let cv = row
            .cv_accuracy_mean
            .map(|m| {
                format!(
                    "{:.4}±{:.3}",
                    m,
                    row.cv_accuracy_std.unwrap_or(0.0)
                )
            })
            .unwrap_or_else(|| "-".to_string());

        println!(
            "  {:<22} {:>9.4} {:>9.4} {:>9} {:>12} {:>9.2}s",
            row.model_name, row.accuracy, row.f1_score, auc, cv, row.training_time_secs
        );
    }
    println!("  {}", dim(&"─".repeat(74)));

    if let Some(best) = table.first() {
        println!();
        println!(
            "  {} {} {} {:.4}",
            ok("best"),
            best.model_name.white().bold(),
            muted("score:"),
            best.selection_score()
        );
    }
}

fn print_engine_metrics(engine: &TrainEngine) {
    if let Some(metrics) = engine.metrics() {
        println!();
        println!(
            "  {:<16} {}",
            muted("Accuracy"),
            format!("{:.4}", metrics.accuracy).white().bold()
        );
        println!("  {:<16} {:.4}", muted("Precision"), metrics.precision);
        println!("  {:<16} {:.4}", muted("Recall"), metrics.recall);
        println!("  {:<16} {:.4}", muted("F1"), metrics.f1_score);
        if let Some(auc) = metrics.roc_auc {
            println!("  {:<16} {:.4}", muted("ROC-AUC"), auc);
        }
        if let Some(cv) = engine.cv_results() {
            println!(
                "  {:<16} {:.4} ± {:.4}",
                muted("CV Accuracy"),
                cv.accuracy_mean,
                cv.accuracy_std
            );
        }
        println!(
            "  {:<16} {:.3}s",
            muted("Time"),
            metrics.training_time_secs
        );
    }
}

/// Load a CSV of raw band readings (headerless, exactly 60 numeric columns)
fn load_band_rows(path: &Path) -> anyhow::Result<Array2<f64>> {
    use polars::prelude::*;

    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(false)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    if df.width() != BAND_COUNT {
        anyhow::bail!(
            "Expected {} band columns, got {} (drop the label column for prediction input)",
            BAND_COUNT,
            df.width()
        );
    }

    let n_rows = df.height();
    let mut data = Vec::with_capacity(n_rows * BAND_COUNT);
    let columns: Vec<Vec<f64>> = df
        .get_columns()
        .iter()
        .map(|col| {
            let col_f64 = col.cast(&DataType::Float64)?;
            Ok(col_f64
                .f64()?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect())
        })
        .collect::<PolarsResult<Vec<Vec<f64>>>>()?;

    for r in 0..n_rows {
        for col in &columns {
            data.push(col[r]);
        }
    }

    Ok(Array2::from_shape_vec((n_rows, BAND_COUNT), data)?)
}
