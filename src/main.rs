//! sonar-detect - Main entry point
//!
//! Trains rock-vs-mine classifiers on SONAR readings and serves predictions.

use clap::Parser;
use sonar_detect::cli::{cmd_compare, cmd_info, cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sonar_detect=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            model,
            scaler,
            cv_folds,
            seed,
            output,
            backup_output,
        } => {
            cmd_train(
                &data,
                &model,
                &scaler,
                cv_folds,
                seed,
                &output,
                backup_output.as_deref(),
            )?;
        }
        Commands::Compare {
            data,
            cv_folds,
            seed,
        } => {
            cmd_compare(&data, cv_folds, seed)?;
        }
        Commands::Predict { model, data } => {
            cmd_predict(&model, &data)?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::Serve {
            port,
            host,
            model,
            backup_model,
        } => {
            cmd_serve(&host, port, model, backup_model).await?;
        }
    }

    Ok(())
}
