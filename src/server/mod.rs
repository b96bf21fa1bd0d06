//! SONAR prediction server
//!
//! Serves the prediction web form and the JSON API over a read-only model
//! loaded at startup.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ServerError;
pub use state::AppState;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub backup_model_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("SONAR_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("SONAR_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            model_path: std::env::var("SONAR_MODEL")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models/sonar_model.json")),
            backup_model_path: std::env::var("SONAR_BACKUP_MODEL")
                .ok()
                .map(PathBuf::from)
                .or_else(|| Some(PathBuf::from("models/sonar_backup_model.json"))),
        }
    }
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();

    let state = Arc::new(AppState::new(config.clone()));
    if !state.models_loaded() {
        tracing::warn!(
            model = %config.model_path.display(),
            "No model loaded; train one with `sonar-detect train` before serving predictions"
        );
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        host = %config.host,
        port = config.port,
        started_at = %start_time.to_rfc3339(),
        "SONAR prediction server starting"
    );
    info!(url = %format!("http://{}", addr), "Web form available");
    info!(url = %format!("http://{}/api/predict", addr), "Prediction API available");
    info!(url = %format!("http://{}/health", addr), "Health endpoint available");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 5000);
        assert!(config.model_path.to_string_lossy().contains("sonar_model"));
    }
}
