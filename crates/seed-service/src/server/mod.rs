//! HTTP prediction service.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/predict` | POST | Predict `{"data": [records]}` |
//! | `/health` | GET | Liveness and whether a model is loaded |
//! | `/model/info` | GET | Metadata of the current model |
//! | `/model/load` | POST | Replace the current model from `{"model_path"}` |

mod api;
mod error;
mod handlers;
mod state;

pub use crate::config::ServerConfig;
pub use api::create_router;
pub use error::ServerError;
pub use state::{AppState, LoadedModel};

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Build the state for `config`, loading `config.model_path` when it exists.
pub fn startup_state(config: ServerConfig) -> AppState {
    let state = AppState::new(config);
    let path = state.config.model_path.clone();
    if path.exists() {
        if let Err(e) = state.load_from(&path) {
            warn!(path = %path.display(), error = %e, "Could not load model at startup");
        }
    } else {
        warn!(path = %path.display(), "Model file not found, serving without a model");
    }
    state
}

/// Start the server with the given configuration
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let started_at = chrono::Utc::now();
    let addr: SocketAddr = config.address().parse()?;
    let state = Arc::new(startup_state(config));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, pid = std::process::id(), "Server listening");

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        let uptime = chrono::Utc::now().signed_duration_since(started_at);
        info!(uptime_secs = uptime.num_seconds(), "Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
