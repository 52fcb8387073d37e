//! Configuration for the preprocessing stage.
//!
//! Built with [`PreprocessConfig::builder()`]; `build()` validates.

use serde::{Deserialize, Serialize};

/// Name of the sales quantity column the pipeline predicts.
pub const DEFAULT_TARGET_COLUMN: &str = "UNITS";

/// Settings for [`Preprocessor`](crate::Preprocessor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Target column summed during aggregation and filtered for outliers.
    /// Default: "UNITS"
    pub target_column: String,

    /// Multiplier applied to the IQR when computing outlier bounds.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Run the lifecycle monotonicity filter as the last `fit` step.
    /// Default: false
    pub enforce_lifecycle_order: bool,

    /// Entity column used by the lifecycle filter.
    /// Default: "PRODUCT"
    pub entity_column: String,

    /// Time column used by the lifecycle filter.
    /// Default: "SALESYEAR"
    pub time_column: String,

    /// Lifecycle stage column.
    /// Default: "LIFECYCLE"
    pub lifecycle_column: String,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            iqr_multiplier: 1.5,
            enforce_lifecycle_order: false,
            entity_column: "PRODUCT".to_string(),
            time_column: "SALESYEAR".to_string(),
            lifecycle_column: "LIFECYCLE".to_string(),
        }
    }
}

impl PreprocessConfig {
    /// Create a new builder.
    pub fn builder() -> PreprocessConfigBuilder {
        PreprocessConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("target_column", &self.target_column),
            ("entity_column", &self.entity_column),
            ("time_column", &self.time_column),
            ("lifecycle_column", &self.lifecycle_column),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName(field.to_string()));
            }
        }

        if !self.iqr_multiplier.is_finite() || self.iqr_multiplier < 0.0 {
            return Err(ConfigValidationError::InvalidIqrMultiplier(
                self.iqr_multiplier,
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column name for '{0}' must not be empty")]
    EmptyColumnName(String),

    #[error("Invalid IQR multiplier: {0} (must be finite and non-negative)")]
    InvalidIqrMultiplier(f64),
}

impl From<ConfigValidationError> for crate::ProcessingError {
    fn from(err: ConfigValidationError) -> Self {
        crate::ProcessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PreprocessConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessConfigBuilder {
    target_column: Option<String>,
    iqr_multiplier: Option<f64>,
    enforce_lifecycle_order: Option<bool>,
    entity_column: Option<String>,
    time_column: Option<String>,
    lifecycle_column: Option<String>,
}

impl PreprocessConfigBuilder {
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.iqr_multiplier = Some(multiplier);
        self
    }

    pub fn enforce_lifecycle_order(mut self, enabled: bool) -> Self {
        self.enforce_lifecycle_order = Some(enabled);
        self
    }

    pub fn entity_column(mut self, column: impl Into<String>) -> Self {
        self.entity_column = Some(column.into());
        self
    }

    pub fn time_column(mut self, column: impl Into<String>) -> Self {
        self.time_column = Some(column.into());
        self
    }

    pub fn lifecycle_column(mut self, column: impl Into<String>) -> Self {
        self.lifecycle_column = Some(column.into());
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<PreprocessConfig, ConfigValidationError> {
        let defaults = PreprocessConfig::default();
        let config = PreprocessConfig {
            target_column: self.target_column.unwrap_or(defaults.target_column),
            iqr_multiplier: self.iqr_multiplier.unwrap_or(defaults.iqr_multiplier),
            enforce_lifecycle_order: self
                .enforce_lifecycle_order
                .unwrap_or(defaults.enforce_lifecycle_order),
            entity_column: self.entity_column.unwrap_or(defaults.entity_column),
            time_column: self.time_column.unwrap_or(defaults.time_column),
            lifecycle_column: self.lifecycle_column.unwrap_or(defaults.lifecycle_column),
        };

        config.validate()?;
        Ok(config)
    }
}
