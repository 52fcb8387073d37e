//! Error types for sourcing, cleaning and feature derivation.
//!
//! Errors serialize as `{code, message}` so the serving layer can hand them
//! to clients unchanged.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the processing crate.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input data cannot be turned into a table.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The data source location does not exist.
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProcessingError>,
    },
}

impl ProcessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProcessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::SourceNotFound(_) => "SOURCE_NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller supplied bad input (as opposed to an internal failure).
    pub fn is_input_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::InvalidData(_) => true,
            Self::WithContext { source, .. } => source.is_input_error(),
            _ => false,
        }
    }
}

impl Serialize for ProcessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProcessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProcessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ProcessingError::ColumnNotFound("UNITS".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            ProcessingError::SourceNotFound("x.csv".to_string()).error_code(),
            "SOURCE_NOT_FOUND"
        );
    }

    #[test]
    fn test_is_input_error() {
        assert!(ProcessingError::InvalidData("bad record".to_string()).is_input_error());
        assert!(!ProcessingError::SourceNotFound("x.csv".to_string()).is_input_error());
        assert!(!ProcessingError::InvalidConfig("iqr".to_string()).is_input_error());
    }

    #[test]
    fn test_with_context_keeps_code() {
        let err = ProcessingError::ColumnNotFound("UNITS".to_string())
            .with_context("Aggregating target");
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.is_input_error());
        assert_eq!(
            err.to_string(),
            "Aggregating target: Column 'UNITS' not found in dataset"
        );
    }

    #[test]
    fn test_serialize_error() {
        let err = ProcessingError::InvalidData("empty record list".to_string());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_DATA");
        assert_eq!(json["message"], "Invalid data: empty record list");
    }

    #[test]
    fn test_result_ext_on_polars_error() {
        let res: std::result::Result<(), polars::error::PolarsError> = Err(
            polars::error::PolarsError::ColumnNotFound("PLANT_HEIGHT".into()),
        );
        let err = res.context("Deriving features").unwrap_err();
        assert_eq!(err.error_code(), "POLARS_ERROR");
        assert!(err.to_string().starts_with("Deriving features"));
    }
}
