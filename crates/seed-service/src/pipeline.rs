//! End-to-end orchestration: source → clean → features → select → score.
//!
//! # Example
//!
//! ```rust,ignore
//! use seed_processing::DataSource;
//! use seed_service::ForecastPipeline;
//!
//! let mut pipeline = ForecastPipeline::default();
//! let result = pipeline.fit(&DataSource::new("case_study_data.csv"))?;
//! println!("Selected {}", result.model.model_name());
//!
//! let predictions = pipeline.score(&DataSource::new("next_season.csv"))?;
//! ```

use polars::prelude::DataFrame;
use seed_learning::{
    CandidateSpec, LearningError, ModelSelector, Result, SelectionConfig, SelectionResult,
    TrainedModel,
};
use seed_processing::{DataSource, FeatureEngineer, PreprocessConfig, Preprocessor};
use tracing::{info, warn};

/// Training and scoring driver. Keeps the model selected by the last
/// [`fit`](Self::fit).
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    preprocessor: Preprocessor,
    features: FeatureEngineer,
    selector: ModelSelector,
    model: Option<TrainedModel>,
}

impl Default for ForecastPipeline {
    fn default() -> Self {
        Self::new(PreprocessConfig::default(), SelectionConfig::default())
    }
}

impl ForecastPipeline {
    pub fn new(preprocess: PreprocessConfig, selection: SelectionConfig) -> Self {
        Self {
            preprocessor: Preprocessor::new(preprocess),
            features: FeatureEngineer::new(),
            selector: ModelSelector::new(selection),
            model: None,
        }
    }

    /// Pipeline that only scores, around an already trained model.
    pub fn from_model(model: TrainedModel) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<CandidateSpec>) -> Self {
        self.selector = self.selector.with_candidates(candidates);
        self
    }

    pub fn model(&self) -> Option<&TrainedModel> {
        self.model.as_ref()
    }

    pub fn into_model(self) -> Option<TrainedModel> {
        self.model
    }

    pub fn fit(&mut self, source: &DataSource) -> Result<SelectionResult> {
        let raw = source.read_local()?;
        self.fit_frame(raw)
    }

    /// Clean `raw` in fit mode, derive features, and select a model.
    pub fn fit_frame(&mut self, raw: DataFrame) -> Result<SelectionResult> {
        let cleaned = self.preprocessor.fit(raw)?;
        info!(
            rows_in = cleaned.summary.rows_in,
            rows_out = cleaned.summary.rows_out,
            "Preprocessing finished"
        );
        let features = self.features.feature_engineering(cleaned.frame)?;
        let result = self.selector.select(&features)?;

        for c in &result.comparisons {
            info!(
                model = %c.name,
                cv_score = c.cv_score,
                test_score = c.test_score,
                test_rmse = c.test_rmse,
                overfitting = %c.overfitting_risk,
                "Candidate summary"
            );
        }
        self.model = Some(result.model.clone());
        Ok(result)
    }

    pub fn score(&self, source: &DataSource) -> Result<Vec<f64>> {
        let raw = source.read_local()?;
        self.score_frame(raw)
    }

    /// Predict every complete row of `raw`.
    ///
    /// # Errors
    ///
    /// [`LearningError::InferenceError`] before a model is fitted or loaded;
    /// [`LearningError::MissingFeatures`] when a trained feature column
    /// cannot be derived from `raw`.
    pub fn score_frame(&self, raw: DataFrame) -> Result<Vec<f64>> {
        let model = self.model.as_ref().ok_or_else(|| {
            LearningError::InferenceError("no model has been fitted or loaded".to_string())
        })?;
        score_with_model(model, raw)
    }
}

/// Score-mode cleaning, feature derivation and prediction with `model`.
///
/// Rows with a missing value are dropped before prediction, so the output
/// can be shorter than the input.
pub fn score_with_model(model: &TrainedModel, raw: DataFrame) -> Result<Vec<f64>> {
    let (cleaned, report) = Preprocessor::default().score(raw)?;
    if report.rows_after < report.rows_before {
        warn!(
            dropped = report.rows_before - report.rows_after,
            rows = report.rows_before,
            "Dropped incomplete rows before scoring"
        );
    }
    let features = FeatureEngineer::new().feature_engineering(cleaned)?;
    let predictions = model.predict(&features)?;
    info!(count = predictions.len(), model = model.model_name(), "Generated predictions");
    Ok(predictions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_before_fit_is_an_error() {
        let pipeline = ForecastPipeline::default();
        let df = DataFrame::empty();
        let err = pipeline.score_frame(df).unwrap_err();
        assert_eq!(err.error_code(), "INFERENCE_ERROR");
        assert!(pipeline.model().is_none());
    }
}
