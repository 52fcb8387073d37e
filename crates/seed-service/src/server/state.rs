//! Application state management

use arc_swap::ArcSwapOption;
use chrono::{DateTime, SecondsFormat, Utc};
use seed_learning::TrainedModel;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::ServerConfig;

/// A model currently served, with where and when it was loaded.
#[derive(Debug)]
pub struct LoadedModel {
    pub model: TrainedModel,
    pub path: Option<PathBuf>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn new(model: TrainedModel, path: Option<PathBuf>) -> Self {
        Self {
            model,
            path,
            loaded_at: Utc::now(),
        }
    }

    /// Body of `GET /model/info` for a loaded model.
    pub fn describe(&self) -> Value {
        let info = self.model.info();
        json!({
            "loaded": true,
            "model_type": info.model_type,
            "model_name": info.model_name,
            "target_column": info.target_column,
            "features": info.features,
            "last_loaded": self.loaded_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            "trained_at": info.trained_at,
            "metrics": info.metrics,
            "hyperparameters": info.hyperparameters,
        })
    }
}

/// Application state shared across handlers.
///
/// Handlers read the current model without locking; a reload swaps in a new
/// `Arc` and in-flight requests finish on the one they loaded.
pub struct AppState {
    pub config: ServerConfig,
    model: ArcSwapOption<LoadedModel>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            model: ArcSwapOption::empty(),
        }
    }

    pub fn with_model(config: ServerConfig, model: TrainedModel) -> Self {
        let state = Self::new(config);
        state.install(LoadedModel::new(model, None));
        state
    }

    pub fn current(&self) -> Option<Arc<LoadedModel>> {
        self.model.load_full()
    }

    pub fn is_loaded(&self) -> bool {
        self.model.load().is_some()
    }

    pub fn install(&self, loaded: LoadedModel) -> Arc<LoadedModel> {
        info!(model = loaded.model.model_name(), path = ?loaded.path, "Serving model");
        let loaded = Arc::new(loaded);
        self.model.store(Some(Arc::clone(&loaded)));
        loaded
    }

    /// Load an artifact from disk and make it current.
    pub fn load_from(&self, path: &Path) -> seed_learning::Result<Arc<LoadedModel>> {
        let model = TrainedModel::load(path)?;
        Ok(self.install(LoadedModel::new(model, Some(path.to_path_buf()))))
    }

    /// Body of `GET /model/info`.
    pub fn describe(&self) -> Value {
        match self.current() {
            Some(loaded) => loaded.describe(),
            None => json!({
                "loaded": false,
                "model_type": null,
                "features": [],
                "last_loaded": null,
            }),
        }
    }
}
