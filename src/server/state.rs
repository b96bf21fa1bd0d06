//! Application state

use crate::inference::InferenceEngine;
use std::sync::Arc;
use tracing::{error, info};

use super::ServerConfig;

/// State shared across handlers. Models load once at startup and are
/// read-only afterwards, so no locking is needed.
pub struct AppState {
    pub config: ServerConfig,
    pub engine: Option<Arc<InferenceEngine>>,
}

impl AppState {
    /// Load the configured artifacts. A missing or broken primary model does
    /// not abort startup; the server runs degraded and reports unhealthy.
    pub fn new(config: ServerConfig) -> Self {
        let engine = Self::load_engine(&config.model_path, config.backup_model_path.as_deref());
        Self { config, engine }
    }

    /// Build state with a preloaded engine (used by tests)
    pub fn with_engine(config: ServerConfig, engine: Option<InferenceEngine>) -> Self {
        Self {
            config,
            engine: engine.map(Arc::new),
        }
    }

    fn load_engine(
        model_path: &std::path::Path,
        backup_path: Option<&std::path::Path>,
    ) -> Option<Arc<InferenceEngine>> {
        // Drop the backup path quietly when the file is absent; the primary
        // model alone is a valid deployment.
        let backup_path = backup_path.filter(|p| p.exists());

        match InferenceEngine::load(model_path, backup_path) {
            Ok(engine) => {
                info!(
                    model = %engine.model_name(),
                    has_backup = engine.has_backup(),
                    path = %model_path.display(),
                    "Model artifacts loaded"
                );
                Some(Arc::new(engine))
            }
            Err(e) => {
                error!(
                    path = %model_path.display(),
                    error = %e,
                    "Could not load model artifact; serving degraded"
                );
                None
            }
        }
    }

    /// Whether prediction is possible
    pub fn models_loaded(&self) -> bool {
        self.engine.is_some()
    }
}
