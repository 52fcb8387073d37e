//! Integration tests: batch training and scoring

use pretty_assertions::assert_eq;
use seed_learning::{CandidateSpec, ModelFamily, ParamGrid, SelectionConfig, TrainedModel};
use seed_processing::{DataSource, PreprocessConfig};
use seed_service::ForecastPipeline;
use seed_service::server::{AppState, startup_state};
use seed_service::ServerConfig;
use std::path::PathBuf;

fn fixture(name: &str) -> DataSource {
    DataSource::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name))
}

fn pipeline() -> ForecastPipeline {
    let selection = SelectionConfig::builder().cv_folds(3).build().unwrap();
    ForecastPipeline::new(PreprocessConfig::default(), selection).with_candidates(vec![
        CandidateSpec::new(ModelFamily::Lasso, ParamGrid::new().with("alpha", [0.1, 1.0])),
        CandidateSpec::new(ModelFamily::Ridge, ParamGrid::new().with("alpha", [0.1, 1.0])),
    ])
}

#[test]
fn test_fit_then_score() {
    let mut pipeline = pipeline();
    let result = pipeline.fit(&fixture("seed_sales.csv")).unwrap();
    assert_eq!(result.comparisons.len(), 2);
    assert_eq!(pipeline.model().unwrap().model_name(), result.model.model_name());

    let predictions = pipeline.score(&fixture("seed_scoring.csv")).unwrap();
    assert_eq!(predictions.len(), 4);
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_saved_model_scores_in_new_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best_model.json");

    let mut trained = pipeline();
    trained.fit(&fixture("seed_sales.csv")).unwrap();
    trained.model().unwrap().save(&path).unwrap();
    let expected = trained.score(&fixture("seed_scoring.csv")).unwrap();

    let restored = ForecastPipeline::from_model(TrainedModel::load(&path).unwrap());
    let actual = restored.score(&fixture("seed_scoring.csv")).unwrap();
    for (a, b) in expected.iter().zip(&actual) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }
}

#[test]
fn test_missing_source_file() {
    let err = pipeline().fit(&fixture("absent.csv")).unwrap_err();
    assert!(err.to_string().contains("absent.csv"), "{err}");
}

#[test]
fn test_startup_without_model_file() {
    let config = ServerConfig::default().with_overrides(None, None, Some("/no/model.json".into()));
    let state: AppState = startup_state(config);
    assert!(!state.is_loaded());
}
