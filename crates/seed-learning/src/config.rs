//! Configuration for the model selector.
//!
//! # Example
//!
//! ```
//! use seed_learning::{Scoring, SelectionConfig};
//!
//! let config = SelectionConfig::builder()
//!     .target_column("UNITS")
//!     .cv_folds(5)
//!     .test_size(0.2)
//!     .scoring(Scoring::R2)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use crate::metrics::Scoring;
use seed_processing::DEFAULT_TARGET_COLUMN;

/// Categorical columns encoded by lifecycle order instead of target mean.
pub const DEFAULT_ORDINAL_COLUMNS: &[&str] = &["LIFECYCLE"];

/// Settings for one selection run.
///
/// Use [`SelectionConfig::builder()`] to construct a validated configuration.
///
/// # Validation
///
/// [`build()`](SelectionConfigBuilder::build) checks:
/// - `target_column` is not empty
/// - `test_size` is in `(0.0, 1.0)` (exclusive)
/// - `cv_folds` is at least 2
/// - `n_jobs` is `-1` or at least 1
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Name of the target column (default: `UNITS`).
    pub target_column: String,

    /// Fraction of rows held out for the test evaluation (default: 0.2).
    pub test_size: f64,

    /// Number of cross-validation folds (default: 5).
    pub cv_folds: usize,

    /// Seed for the split and for every seeded estimator (default: 42).
    pub random_seed: u64,

    /// Number of parallel jobs (default: -1 for all cores).
    ///
    /// - `-1`: Use all available CPU cores
    /// - `1`: Single-threaded
    /// - `n > 1`: Use exactly `n` cores
    pub n_jobs: i32,

    /// Metric that ranks grid combinations and families (default: r2).
    pub scoring: Scoring,

    /// Categorical columns given an ordinal lifecycle encoding.
    pub ordinal_columns: Vec<String>,

    /// Keep going when a candidate family fails (default: false).
    ///
    /// When disabled, the first failing candidate aborts the run.
    pub isolate_candidate_failures: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            test_size: 0.2,
            cv_folds: 5,
            random_seed: 42,
            n_jobs: -1,
            scoring: Scoring::default(),
            ordinal_columns: DEFAULT_ORDINAL_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            isolate_candidate_failures: false,
        }
    }
}

impl SelectionConfig {
    #[must_use]
    pub fn builder() -> SelectionConfigBuilder {
        SelectionConfigBuilder::default()
    }
}

/// Builder for [`SelectionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SelectionConfigBuilder {
    config: SelectionConfig,
}

impl SelectionConfigBuilder {
    #[must_use]
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.config.target_column = column.into();
        self
    }

    /// Set the test size fraction (default: 0.2).
    ///
    /// [`build()`](Self::build) returns an error if `size <= 0.0` or `size >= 1.0`.
    #[must_use]
    pub fn test_size(mut self, size: f64) -> Self {
        self.config.test_size = size;
        self
    }

    /// Set the number of cross-validation folds (default: 5).
    #[must_use]
    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.config.cv_folds = folds;
        self
    }

    #[must_use]
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.config.random_seed = seed;
        self
    }

    #[must_use]
    pub fn n_jobs(mut self, jobs: i32) -> Self {
        self.config.n_jobs = jobs;
        self
    }

    #[must_use]
    pub fn scoring(mut self, scoring: Scoring) -> Self {
        self.config.scoring = scoring;
        self
    }

    #[must_use]
    pub fn ordinal_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ordinal_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn isolate_candidate_failures(mut self, isolate: bool) -> Self {
        self.config.isolate_candidate_failures = isolate;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any constraint listed on
    /// [`SelectionConfig`] is violated.
    pub fn build(self) -> Result<SelectionConfig, LearningError> {
        if self.config.target_column.trim().is_empty() {
            return Err(LearningError::InvalidConfig(
                "target_column must not be empty".to_string(),
            ));
        }

        if !(self.config.test_size > 0.0 && self.config.test_size < 1.0) {
            return Err(LearningError::InvalidConfig(
                "test_size must be between 0.0 and 1.0 (exclusive)".to_string(),
            ));
        }

        if self.config.cv_folds < 2 {
            return Err(LearningError::InvalidConfig(
                "cv_folds must be at least 2".to_string(),
            ));
        }

        if self.config.n_jobs == 0 || self.config.n_jobs < -1 {
            return Err(LearningError::InvalidConfig(
                "n_jobs must be -1 (all cores) or at least 1".to_string(),
            ));
        }

        Ok(self.config)
    }
}
