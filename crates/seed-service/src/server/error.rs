//! Error types for the server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("Server error: {0}")]
    Prediction(String),

    #[error("Failed to load model")]
    LoadFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Prediction(_) | ServerError::LoadFailed(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match &self {
            ServerError::Prediction(detail) => {
                tracing::error!(detail = %detail, "Error in predict endpoint");
            }
            ServerError::LoadFailed(detail) => {
                tracing::error!(detail = %detail, "Error loading model");
            }
            ServerError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal server error");
            }
            ServerError::BadRequest(_) | ServerError::ModelNotLoaded => {}
        }

        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
