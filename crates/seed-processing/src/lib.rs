//! Seed sales data processing.
//!
//! Turns raw sales records into a feature table ready for model selection:
//!
//! - **Sourcing**: [`DataSource`] reads delimited files; [`records_to_frame`]
//!   builds a table from JSON records.
//! - **Cleaning**: [`Preprocessor`] removes duplicates and missing rows,
//!   aggregates the target over repeated feature combinations, filters
//!   outliers, and can enforce lifecycle ordering per product.
//! - **Features**: [`FeatureEngineer`] derives agronomic features from a
//!   declared dependency list.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed_processing::{DataSource, FeatureEngineer, Preprocessor};
//!
//! let raw = DataSource::new("case_study_data.csv").read_local()?;
//! let cleaned = Preprocessor::default().fit(raw)?;
//! let features = FeatureEngineer::new().transform(cleaned.frame)?;
//! println!("skipped derivations: {:?}", features.skipped);
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod lifecycle;
pub mod preprocess;
pub mod source;
pub mod utils;

pub use config::{ConfigValidationError, DEFAULT_TARGET_COLUMN, PreprocessConfig, PreprocessConfigBuilder};
pub use error::{ProcessingError, Result, ResultExt};
pub use features::{
    DERIVED_FEATURES, DROPPED_COLUMNS, DerivedFeature, FeatureEngineer, FeatureOutput, FeaturePlan,
    SkippedFeature,
};
pub use lifecycle::{LifecycleStage, UnknownLifecycleStage};
pub use preprocess::{MissingValueReport, OutlierBounds, PreprocessSummary, Preprocessed, Preprocessor};
pub use source::{DEFAULT_TRAINING_FILE, DataSource, records_to_frame};

static_assertions::assert_impl_all!(Preprocessor: Send, Sync);
static_assertions::assert_impl_all!(FeatureEngineer: Send, Sync, Copy);
