//! The selected pipeline as a persisted, self-describing artifact.
//!
//! [`TrainedModel`] carries everything needed to score a feature table in a
//! separate process: the ordered feature names, the fitted encoder and
//! estimator, and the training metadata.
//!
//! # Example
//!
//! ```rust,ignore
//! use seed_learning::TrainedModel;
//!
//! let model = TrainedModel::load("best_model.json")?;
//! let predictions = model.predict(&features)?;
//! println!("{} predicted {} rows", model.model_name(), predictions.len());
//! ```
//!
//! # Serialization Formats
//!
//! | Method | Use Case |
//! |--------|----------|
//! | [`save()`](TrainedModel::save) / [`load()`](TrainedModel::load) | File-based persistence |
//! | [`to_bytes()`](TrainedModel::to_bytes) / [`from_bytes()`](TrainedModel::from_bytes) | Storage or network transfer |

use crate::error::{LearningError, Result};
use crate::estimators::ModelFamily;
use crate::frame::FeatureFrame;
use crate::params::ParamSet;
use crate::pipeline::RegressionPipeline;
use crate::types::{Metrics, ModelInfo};
use chrono::{DateTime, SecondsFormat, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Artifact layout version written into every saved model.
pub const FORMAT_VERSION: u32 = 1;

/// A fitted encoding + estimator pipeline with its training metadata.
///
/// Immutable once built; a new training run produces a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    format_version: u32,
    family: ModelFamily,
    target_column: String,
    features: Vec<String>,
    /// Grid combination that won cross-validation.
    selected_params: ParamSet,
    pipeline: RegressionPipeline,
    metrics: Metrics,
    trained_at: DateTime<Utc>,
}

impl TrainedModel {
    pub(crate) fn new(
        target_column: String,
        features: Vec<String>,
        selected_params: ParamSet,
        pipeline: RegressionPipeline,
        metrics: Metrics,
    ) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            family: pipeline.estimator.family(),
            target_column,
            features,
            selected_params,
            pipeline,
            metrics,
            trained_at: Utc::now(),
        }
    }

    /// Loads a model saved with [`save()`](Self::save).
    ///
    /// # Errors
    ///
    /// - [`LearningError::ModelNotFound`] if the file does not exist
    /// - [`LearningError::Json`] if the file is not a model artifact
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LearningError::ModelNotFound {
                path: path.display().to_string(),
            });
        }
        let model = Self::from_bytes(&fs::read(path)?)?;
        info!(path = %path.display(), model = model.model_name(), "Model loaded");
        Ok(model)
    }

    /// Saves the model as JSON. Parent directories must exist.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()?)?;
        info!(path = %path.display(), model = self.model_name(), "Model saved");
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model: Self = serde_json::from_slice(bytes)?;
        if model.format_version != FORMAT_VERSION {
            return Err(LearningError::InvalidData(format!(
                "unsupported model format version {} (expected {FORMAT_VERSION})",
                model.format_version
            )));
        }
        Ok(model)
    }

    /// Predict one value per row of `df`.
    ///
    /// Only the remembered feature columns are read, in training order;
    /// extra columns are ignored.
    ///
    /// # Errors
    ///
    /// [`LearningError::MissingFeatures`] names every feature column absent
    /// from `df`.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let frame = FeatureFrame::select(df, &self.features)?;
        self.pipeline.predict(&frame)
    }

    pub fn model_name(&self) -> &'static str {
        self.family.name()
    }

    pub fn family(&self) -> ModelFamily {
        self.family
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn selected_params(&self) -> &ParamSet {
        &self.selected_params
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            model_name: self.model_name().to_string(),
            model_type: "regression".to_string(),
            target_column: self.target_column.clone(),
            features: self.features.clone(),
            hyperparameters: self.pipeline.estimator.params(),
            metrics: self.metrics,
            trained_at: self.trained_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn fitted() -> TrainedModel {
        let df = df! {
            "STATE" => ["IA", "IL", "IA", "IL", "NE", "NE"],
            "PLANT_HEIGHT" => [3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            "UNITS" => [10.0, 20.0, 30.0, 40.0, 50.0, 60.0],
        }
        .unwrap();
        let (frame, y) = FeatureFrame::with_target(&df, "UNITS").unwrap();
        let split = frame.split_columns(&[]);
        let params = ParamSet::new().with("alpha", 0.1);
        let pipeline =
            RegressionPipeline::fit(ModelFamily::Ridge, &params, None, &split, &frame, &y).unwrap();
        TrainedModel::new(
            "UNITS".to_string(),
            frame.names().to_vec(),
            params,
            pipeline,
            Metrics::default(),
        )
    }

    #[test]
    fn test_predict_ignores_extra_columns() {
        let model = fitted();
        let input = df! {
            "EXTRA" => ["x"],
            "PLANT_HEIGHT" => [4.0],
            "STATE" => ["IL"],
        }
        .unwrap();
        let predictions = model.predict(&input).unwrap();
        assert_eq!(predictions.len(), 1);
        assert!(predictions[0].is_finite());
    }

    #[test]
    fn test_predict_reports_missing_features() {
        let model = fitted();
        let input = df! { "PLANT_HEIGHT" => [4.0] }.unwrap();
        match model.predict(&input).unwrap_err() {
            LearningError::MissingFeatures(missing) => assert_eq!(missing, vec!["STATE"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let model = fitted();
        let restored = TrainedModel::from_bytes(&model.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.info(), model.info());
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrainedModel::load("no/such/model.json").unwrap_err();
        assert!(matches!(err, LearningError::ModelNotFound { .. }));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("best_model.json");
        let model = fitted();
        model.save(&path).unwrap();

        let loaded = TrainedModel::load(&path).unwrap();
        assert_eq!(loaded.model_name(), "Ridge");
        assert_eq!(loaded.features(), model.features());
        assert_eq!(loaded.info().model_type, "regression");
    }

    #[test]
    fn test_rejects_foreign_json() {
        let err = TrainedModel::from_bytes(br#"{"hello": "world"}"#).unwrap_err();
        assert_eq!(err.error_code(), "JSON_ERROR");
    }
}
