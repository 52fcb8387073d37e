//! seed-learning: model selection for seed sales forecasting.
//!
//! This crate turns a feature table into a fitted regression pipeline. It
//! grid-searches several estimator families with k-fold cross-validation,
//! keeps the family with the best cross-validated score, and persists the
//! result as a self-describing JSON artifact.
//!
//! # Features
//!
//! - **Encoding**: smoothed target encoding for categorical columns, an
//!   ordinal lifecycle encoding, finite-median imputation for numeric columns
//! - **Estimators**: random forest, gradient boosting, lasso, ridge and a
//!   small feed-forward network behind one [`Regressor`] trait
//! - **Grid Search**: exhaustive search with deterministic, parallel
//!   cross-validation on a rayon pool
//! - **Persistence**: [`TrainedModel`] saves and loads as JSON
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use seed_learning::{ModelSelector, SelectionConfig, TrainedModel};
//!
//! let config = SelectionConfig::builder()
//!     .target_column("UNITS")
//!     .cv_folds(5)
//!     .build()?;
//!
//! let result = ModelSelector::new(config).select(&features)?;
//! for c in &result.comparisons {
//!     println!("{:<28} cv={:.4} test={:.4}", c.name, c.cv_score, c.test_score);
//! }
//!
//! result.model.save("best_model.json")?;
//! let model = TrainedModel::load("best_model.json")?;
//! let predictions = model.predict(&new_features)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! DataFrame ──► FeatureFrame ──► train/test split
//!                                      │
//!              ┌───────────────────────┘
//!              ▼
//!   for each CandidateSpec:  GridSearch (k-fold, rayon)
//!                            └─► refit best ParamSet ──► test metrics
//!              │
//!              ▼
//!   highest CV score ──► TrainedModel { ColumnEncoder, Estimator }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError):
//!
//! - [`LearningError::InvalidConfig`] - invalid selector or hyperparameter settings
//! - [`LearningError::TargetNotFound`] - target column absent from the table
//! - [`LearningError::CandidateFailed`] - a family failed and failures are not isolated
//! - [`LearningError::MissingFeatures`] - a scoring table lacks trained feature columns
//! - [`LearningError::ModelNotFound`] - no artifact at the given path
//!
//! # Determinism
//!
//! Splits, bootstraps and network initialisation use seeded ChaCha RNGs, and
//! parallel results are gathered by index, so a run is reproducible for a
//! given seed regardless of the thread count.

pub mod config;
pub mod encoding;
pub mod error;
pub mod estimators;
pub mod frame;
pub mod metrics;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod search;
pub mod selector;
pub mod split;
pub mod types;

pub use config::{DEFAULT_ORDINAL_COLUMNS, SelectionConfig, SelectionConfigBuilder};
pub use encoding::{ColumnEncoder, OrdinalEncoder, TargetEncoder};
pub use error::{LearningError, Result};
pub use estimators::{
    DecisionTreeRegressor, Estimator, GradientBoostingRegressor, LassoRegressor, ModelFamily,
    NeuralNetRegressor, RandomForestRegressor, Regressor, RidgeRegressor,
};
pub use frame::{ColumnSplit, FeatureColumn, FeatureFrame};
pub use metrics::{RegressionMetrics, Scoring};
pub use model::TrainedModel;
pub use params::{ParamGrid, ParamSet, ParamValue};
pub use pipeline::RegressionPipeline;
pub use search::{CombinationScore, GridSearch, SearchOutcome};
pub use selector::{CandidateSpec, ModelSelector, default_candidates};
pub use types::{CandidateFailure, Metrics, ModelComparison, ModelInfo, SelectionResult};

static_assertions::assert_impl_all!(TrainedModel: Send, Sync, Clone);
static_assertions::assert_impl_all!(ModelSelector: Send, Sync);
static_assertions::assert_impl_all!(Estimator: Send, Sync);
