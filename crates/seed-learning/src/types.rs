//! Result types returned by the model selector and the trained model.
//!
//! - [`SelectionResult`]: complete result of [`ModelSelector::select`](crate::ModelSelector::select)
//! - [`Metrics`]: evaluation metrics of the selected pipeline
//! - [`ModelComparison`]: per-family comparison data
//! - [`CandidateFailure`]: a family that failed while failures were isolated
//! - [`ModelInfo`]: metadata about a trained model

use crate::model::TrainedModel;
use crate::params::ParamSet;
use serde::{Deserialize, Serialize};

/// Metrics from model evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean cross-validation score of the chosen combination, in the
    /// configured scoring metric.
    pub cv_score: f64,

    /// R² on the training split.
    pub train_score: f64,

    /// R² on the held-out test split.
    pub test_score: f64,

    /// Mean Squared Error on the test split.
    pub mse: f64,

    /// Root Mean Squared Error on the test split, in target units.
    pub rmse: f64,

    /// Mean Absolute Error on the test split.
    pub mae: f64,

    /// R-squared on the test split (same as `test_score`).
    pub r2: f64,
}

/// Comparison data for a single candidate family.
///
/// # Overfitting Risk
///
/// `overfitting_risk` compares train and test R²:
/// - `"low"`: gap < 0.05
/// - `"medium"`: gap 0.05-0.15
/// - `"high"`: gap > 0.15
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Family name (e.g. `RandomForestRegressor`).
    pub name: String,

    /// Best mean cross-validation score; the selection criterion.
    pub cv_score: f64,

    /// R² on the held-out test split. Informational only.
    pub test_score: f64,

    /// R² on the training split.
    pub train_score: f64,

    /// Test RMSE of the refit pipeline.
    pub test_rmse: f64,

    /// Grid search plus refit time in seconds.
    pub training_time_seconds: f64,

    /// Winning grid combination.
    pub hyperparameters: ParamSet,

    /// Number of grid combinations evaluated.
    pub combinations_evaluated: usize,

    pub overfitting_risk: String,
}

/// Classify the gap between train and test scores.
pub fn overfitting_risk(train_score: f64, test_score: f64) -> &'static str {
    let gap = train_score - test_score;
    if gap < 0.05 {
        "low"
    } else if gap <= 0.15 {
        "medium"
    } else {
        "high"
    }
}

/// A candidate that failed with failure isolation enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateFailure {
    pub name: String,
    pub message: String,
}

/// Result of a model selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Best pipeline, refit on the training split.
    pub model: TrainedModel,

    /// One entry per candidate that completed, in declaration order.
    pub comparisons: Vec<ModelComparison>,

    /// Candidates that failed (only populated when failures are isolated).
    pub failures: Vec<CandidateFailure>,

    /// Wall-clock time of the whole run in seconds.
    pub training_time_seconds: f64,
}

/// Information about a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Family name of the selected estimator.
    pub model_name: String,

    /// Always `"regression"`.
    pub model_type: String,

    /// Target column the model was trained to predict.
    pub target_column: String,

    /// Feature columns in the order the model reads them.
    pub features: Vec<String>,

    /// Effective hyperparameters of the fitted estimator.
    pub hyperparameters: ParamSet,

    pub metrics: Metrics,

    /// RFC 3339 timestamp of the end of training.
    pub trained_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overfitting_risk_bands() {
        assert_eq!(overfitting_risk(0.90, 0.88), "low");
        assert_eq!(overfitting_risk(0.90, 0.80), "medium");
        assert_eq!(overfitting_risk(0.99, 0.60), "high");
        assert_eq!(overfitting_risk(0.70, 0.75), "low");
    }
}
