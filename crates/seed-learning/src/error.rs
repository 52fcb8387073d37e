//! Error types for the seed-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Example
//!
//! ```
//! use seed_learning::{LearningError, SelectionConfig};
//!
//! fn configure() -> Result<SelectionConfig, LearningError> {
//!     let config = SelectionConfig::builder()
//!         .target_column("UNITS")
//!         .build()?;
//!     Ok(config)
//! }
//! ```

use seed_processing::ProcessingError;
use thiserror::Error;

/// The main error type for seed-learning operations.
///
/// This enum covers all error conditions that can occur during:
/// - Selection configuration and validation
/// - Encoding and design-matrix construction
/// - Estimator training and grid search
/// - Artifact persistence and prediction
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the selector or an estimator.
    ///
    /// Raised for out-of-range settings and for hyperparameter sets naming a
    /// parameter the family does not know or carrying the wrong value type.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or inference.
    ///
    /// Common causes:
    /// - Table has too few rows for the requested split and folds
    /// - A column has an unsupported dtype
    /// - Feature matrix and target have different lengths
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The specified target column was not found in the table.
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// Training failed, usually because every candidate failed.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// A single candidate family failed during grid search or refit.
    #[error("Candidate '{family}' failed: {message}")]
    CandidateFailed {
        /// Family name of the failing candidate.
        family: String,
        /// Underlying failure.
        message: String,
    },

    /// The specified model file was not found.
    #[error("Model not found: {path}")]
    ModelNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Columns the model was trained on are absent from the input.
    #[error("Missing feature columns: {}", .0.join(", "))]
    MissingFeatures(Vec<String>),

    /// An error occurred during prediction.
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// Failure bubbled up from the processing crate.
    #[error(transparent)]
    Processing(#[from] ProcessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// I/O error during artifact save/load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LearningError {
    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::CandidateFailed { .. } => "CANDIDATE_FAILED",
            Self::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            Self::MissingFeatures(_) => "MISSING_FEATURES",
            Self::InferenceError(_) => "INFERENCE_ERROR",
            Self::Processing(e) => e.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;
