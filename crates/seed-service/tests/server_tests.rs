//! Integration tests: HTTP prediction service

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use seed_learning::{CandidateSpec, ModelFamily, ParamGrid, SelectionConfig, TrainedModel};
use seed_processing::{DataSource, PreprocessConfig};
use seed_service::server::{AppState, create_router};
use seed_service::{ForecastPipeline, ServerConfig};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Trained once and shared; selection is the slow part.
fn trained_model() -> TrainedModel {
    static MODEL: OnceLock<TrainedModel> = OnceLock::new();
    MODEL
        .get_or_init(|| {
            let selection = SelectionConfig::builder().cv_folds(3).build().unwrap();
            let mut pipeline = ForecastPipeline::new(PreprocessConfig::default(), selection)
                .with_candidates(vec![CandidateSpec::new(
                    ModelFamily::Ridge,
                    ParamGrid::new().with("alpha", [0.1, 1.0]),
                )]);
            pipeline
                .fit(&DataSource::new(fixtures_path().join("seed_sales.csv")))
                .unwrap()
                .model
        })
        .clone()
}

fn app_with_model() -> axum::Router {
    create_router(Arc::new(AppState::with_model(
        ServerConfig::default(),
        trained_model(),
    )))
}

fn app_without_model() -> axum::Router {
    create_router(Arc::new(AppState::new(ServerConfig::default())))
}

fn record() -> Value {
    json!({
        "PRODUCT": "P01",
        "STATE": "IA",
        "LIFECYCLE": "EXPANSION",
        "SALESYEAR": 2022,
        "RELEASE_YEAR": 2018,
        "PLANT_HEIGHT": 4,
        "RELATIVE_MATURITY": 2.2,
        "BRITTLE_STALK": 1,
        "DISEASE_RESISTANCE": 2,
        "INSECT_RESISTANCE": 8,
        "PROTECTION": 0,
        "DROUGHT_TOLERANCE": 4
    })
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ============================================================================
// Health and info
// ============================================================================

#[tokio::test]
async fn test_health_without_model() {
    let (status, body) = send(app_without_model(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model_loaded"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_model_info() {
    let (_, empty) = send(app_without_model(), get("/model/info")).await;
    assert_eq!(empty["loaded"], false);
    assert_eq!(empty["model_type"], Value::Null);

    let (status, body) = send(app_with_model(), get("/model/info")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["loaded"], true);
    assert_eq!(body["model_type"], "regression");
    assert_eq!(body["model_name"], "Ridge");
    assert!(body["features"].as_array().unwrap().len() > 10);
    assert!(body["metrics"]["rmse"].is_number());
    assert!(body["last_loaded"].is_string());
}

// ============================================================================
// Prediction
// ============================================================================

#[tokio::test]
async fn test_predict_single_record() {
    let payload = json!({ "data": [record()] }).to_string();
    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::OK);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert!(predictions[0].is_f64());
}

#[tokio::test]
async fn test_predict_without_data_key() {
    let payload = json!({ "rows": [record()] }).to_string();
    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");
    assert!(body.get("predictions").is_none());
}

#[tokio::test]
async fn test_predict_empty_body() {
    let (status, body) = send(app_with_model(), post("/predict", "")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");
}

#[tokio::test]
async fn test_predict_empty_data() {
    let payload = json!({ "data": [] }).to_string();
    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty data provided");
}

#[tokio::test]
async fn test_predict_without_model() {
    let payload = json!({ "data": [record()] }).to_string();
    let (status, body) = send(app_without_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Model not loaded");
}

#[tokio::test]
async fn test_predict_missing_feature_column() {
    let mut incomplete = record();
    incomplete.as_object_mut().unwrap().remove("DROUGHT_TOLERANCE");
    let payload = json!({ "data": [incomplete] }).to_string();

    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Server error: Missing feature columns"), "{message}");
    assert!(message.contains("DROUGHT_TOLERANCE"));
}

#[tokio::test]
async fn test_predict_rejects_record_with_null() {
    let mut partial = record();
    partial["PLANT_HEIGHT"] = Value::Null;
    let payload = json!({ "data": [record(), partial, record()] }).to_string();

    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Incomplete records"), "{message}");
    assert!(message.ends_with("indices: 1"), "{message}");
    assert!(body.get("predictions").is_none());
}

#[tokio::test]
async fn test_predict_rejects_record_missing_a_field() {
    let mut partial = record();
    partial.as_object_mut().unwrap().remove("STATE");
    let payload = json!({ "data": [partial, record()] }).to_string();

    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().ends_with("indices: 0"));
}

#[tokio::test]
async fn test_predict_returns_one_prediction_per_record() {
    let mut other = record();
    other["STATE"] = json!("IL");
    other["PLANT_HEIGHT"] = json!(6);
    let payload = json!({ "data": [record(), other, record()] }).to_string();

    let (status, body) = send(app_with_model(), post("/predict", payload)).await;
    assert_eq!(status, StatusCode::OK);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert_eq!(predictions[0], predictions[2]);
}

// ============================================================================
// Model reload
// ============================================================================

#[tokio::test]
async fn test_load_requires_path() {
    let (status, body) = send(app_without_model(), post("/model/load", "{}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "model_path is required");
}

#[tokio::test]
async fn test_load_missing_file() {
    let payload = json!({ "model_path": "/no/such/model.json" }).to_string();
    let (status, body) = send(app_without_model(), post("/model/load", payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to load model");
}

#[tokio::test]
async fn test_load_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("best_model.json");
    trained_model().save(&path).unwrap();

    let state = Arc::new(AppState::new(ServerConfig::default()));
    let payload = json!({ "model_path": path }).to_string();
    let (status, body) = send(create_router(Arc::clone(&state)), post("/model/load", payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Model loaded successfully");
    assert_eq!(body["model_info"]["model_name"], "Ridge");
    assert!(state.is_loaded());

    let request = json!({ "data": [record(), record()] }).to_string();
    let (status, body) = send(create_router(state), post("/predict", request)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["predictions"].as_array().unwrap().len(), 2);
}
