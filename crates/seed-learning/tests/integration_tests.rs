//! Integration tests for model selection and persisted pipelines.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use seed_learning::selector::best_candidate;
use seed_learning::{
    CandidateSpec, LearningError, ModelFamily, ModelSelector, ParamGrid, SelectionConfig,
    TrainedModel,
};
use seed_processing::{DataSource, FeatureEngineer, Preprocessor};
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn training_features() -> DataFrame {
    let raw = DataSource::new(fixtures_path().join("seed_sales.csv"))
        .read_local()
        .expect("Failed to read fixture");
    let cleaned = Preprocessor::default().fit(raw).unwrap();
    FeatureEngineer::new()
        .feature_engineering(cleaned.frame)
        .unwrap()
}

fn scoring_features() -> DataFrame {
    let raw = DataSource::new(fixtures_path().join("seed_scoring.csv"))
        .read_local()
        .expect("Failed to read fixture");
    let (cleaned, _) = Preprocessor::default().score(raw).unwrap();
    FeatureEngineer::new().feature_engineering(cleaned).unwrap()
}

fn small_candidates() -> Vec<CandidateSpec> {
    vec![
        CandidateSpec::new(
            ModelFamily::RandomForest,
            ParamGrid::new()
                .with("n_estimators", [10i64])
                .with("max_depth", [Some(4i64)]),
        ),
        CandidateSpec::new(
            ModelFamily::Lasso,
            ParamGrid::new().with("alpha", [0.1, 1.0]),
        ),
        CandidateSpec::new(
            ModelFamily::Ridge,
            ParamGrid::new().with("alpha", [0.1, 1.0]),
        ),
    ]
}

fn config() -> SelectionConfig {
    SelectionConfig::builder().cv_folds(3).build().unwrap()
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn test_select_on_fixture() {
    let features = training_features();
    let result = ModelSelector::new(config())
        .with_candidates(small_candidates())
        .select(&features)
        .unwrap();

    let names: Vec<&str> = result.comparisons.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["RandomForestRegressor", "Lasso", "Ridge"]);
    assert!(result.failures.is_empty());
    assert_eq!(result.comparisons[1].combinations_evaluated, 2);

    let model = &result.model;
    assert!(!model.features().contains(&"UNITS".to_string()));
    assert!(model.features().contains(&"PRODUCT_STATE".to_string()));
    assert_eq!(model.target_column(), "UNITS");
    assert!(model.metrics().rmse.is_finite());
    assert_eq!(model.metrics().r2, model.metrics().test_score);
}

#[test]
fn test_winner_has_highest_cv_score() {
    let result = ModelSelector::new(config())
        .with_candidates(small_candidates())
        .select(&training_features())
        .unwrap();

    let best = best_candidate(&result.comparisons);
    assert_eq!(result.model.model_name(), result.comparisons[best].name);
    let max_cv = result
        .comparisons
        .iter()
        .map(|c| c.cv_score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(result.model.metrics().cv_score, max_cv);
}

#[test]
fn test_selection_is_reproducible_across_thread_counts() {
    let features = training_features();
    let run = |jobs: i32| {
        let config = SelectionConfig::builder()
            .cv_folds(3)
            .n_jobs(jobs)
            .build()
            .unwrap();
        ModelSelector::new(config)
            .with_candidates(small_candidates())
            .select(&features)
            .unwrap()
    };

    let single = run(1);
    let parallel = run(-1);
    let scores = |r: &seed_learning::SelectionResult| -> Vec<f64> {
        r.comparisons.iter().map(|c| c.cv_score).collect()
    };
    assert_eq!(scores(&single), scores(&parallel));
    assert_eq!(single.model.model_name(), parallel.model.model_name());
}

#[test]
fn test_missing_target_column() {
    let features = training_features().drop("UNITS").unwrap();
    let err = ModelSelector::new(config())
        .with_candidates(small_candidates())
        .select(&features)
        .unwrap_err();
    assert!(matches!(err, LearningError::TargetNotFound(ref t) if t == "UNITS"));
}

// ============================================================================
// Candidate failures
// ============================================================================

fn broken_candidates() -> Vec<CandidateSpec> {
    vec![
        CandidateSpec::new(
            ModelFamily::GradientBoosting,
            ParamGrid::new().with("depth", [3i64]),
        ),
        CandidateSpec::new(
            ModelFamily::Ridge,
            ParamGrid::new().with("alpha", [1.0]),
        ),
    ]
}

#[test]
fn test_candidate_failure_aborts_by_default() {
    let err = ModelSelector::new(config())
        .with_candidates(broken_candidates())
        .select(&training_features())
        .unwrap_err();
    match err {
        LearningError::CandidateFailed { family, .. } => {
            assert_eq!(family, "GradientBoostingRegressor")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_isolated_failure_is_reported() {
    let config = SelectionConfig::builder()
        .cv_folds(3)
        .isolate_candidate_failures(true)
        .build()
        .unwrap();
    let result = ModelSelector::new(config)
        .with_candidates(broken_candidates())
        .select(&training_features())
        .unwrap();

    assert_eq!(result.model.model_name(), "Ridge");
    assert_eq!(result.comparisons.len(), 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].name, "GradientBoostingRegressor");
    assert!(result.failures[0].message.contains("depth"));
}

#[test]
fn test_every_isolated_failure_is_an_error() {
    let config = SelectionConfig::builder()
        .cv_folds(3)
        .isolate_candidate_failures(true)
        .build()
        .unwrap();
    let err = ModelSelector::new(config)
        .with_candidates(vec![CandidateSpec::new(
            ModelFamily::Lasso,
            ParamGrid::new().with("n_estimators", [1i64]),
        )])
        .select(&training_features())
        .unwrap_err();
    assert_eq!(err.error_code(), "TRAINING_FAILED");
}

// ============================================================================
// Scoring and persistence
// ============================================================================

#[test]
fn test_predict_scoring_fixture() {
    let result = ModelSelector::new(config())
        .with_candidates(small_candidates())
        .select(&training_features())
        .unwrap();

    let predictions = result.model.predict(&scoring_features()).unwrap();
    assert_eq!(predictions.len(), 4);
    assert!(predictions.iter().all(|p| p.is_finite()));
}

#[test]
fn test_missing_feature_column_is_fatal() {
    let result = ModelSelector::new(config())
        .with_candidates(small_candidates())
        .select(&training_features())
        .unwrap();

    let scoring = scoring_features().drop("STRESS_INDEX").unwrap();
    match result.model.predict(&scoring).unwrap_err() {
        LearningError::MissingFeatures(missing) => assert_eq!(missing, vec!["STRESS_INDEX"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_artifact_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best_model.json");

    let config = SelectionConfig::builder().cv_folds(3).build().unwrap();
    let result = ModelSelector::new(config)
        .with_candidates(vec![CandidateSpec::new(
            ModelFamily::Ridge,
            ParamGrid::new().with("alpha", [0.1, 1.0]),
        )])
        .select(&training_features())
        .unwrap();
    result.model.save(&path).unwrap();

    let loaded = TrainedModel::load(&path).unwrap();
    assert_eq!(loaded.info().model_name, "Ridge");
    assert_eq!(loaded.features(), result.model.features());
    assert_eq!(loaded.selected_params(), result.model.selected_params());

    let scoring = scoring_features();
    let before = result.model.predict(&scoring).unwrap();
    let after = loaded.predict(&scoring).unwrap();
    for (a, b) in before.iter().zip(&after) {
        assert!((a - b).abs() < 1e-6, "{a} != {b}");
    }
}
