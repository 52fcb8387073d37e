//! seed-service: training CLI and prediction service for seed sales
//! forecasting.
//!
//! - [`ForecastPipeline`] drives the batch flow: read a CSV, clean it, derive
//!   features, select a model, and score new tables with it.
//! - [`server`] serves a persisted model over HTTP.
//! - [`ServerConfig`] reads the service settings from the environment.

pub mod config;
pub mod pipeline;
pub mod server;

pub use config::ServerConfig;
pub use pipeline::{ForecastPipeline, score_with_model};

static_assertions::assert_impl_all!(server::AppState: Send, Sync);
