//! Request handlers

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use chrono::{SecondsFormat, Utc};
use seed_processing::records_to_frame;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::error::{Result, ServerError};
use super::state::AppState;
use crate::pipeline::score_with_model;

const NO_DATA: &str = "No data provided";

/// `GET /health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "model_loaded": state.is_loaded(),
    }))
}

/// `GET /model/info`
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.describe())
}

/// `POST /model/load` with `{"model_path": "..."}`
pub async fn load_model(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>> {
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let path = request
        .get("model_path")
        .and_then(Value::as_str)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| ServerError::BadRequest("model_path is required".to_string()))?;

    let loader = Arc::clone(&state);
    let loaded = tokio::task::spawn_blocking(move || loader.load_from(&path))
        .await
        .map_err(|e| ServerError::Internal(format!("Task join error: {e}")))?
        .map_err(|e| ServerError::LoadFailed(e.to_string()))?;

    Ok(Json(json!({
        "message": "Model loaded successfully",
        "model_info": loaded.describe(),
    })))
}

/// `POST /predict` with `{"data": [record, ...]}`
pub async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>> {
    let records = parse_records(&body)?;
    if records.is_empty() {
        return Err(ServerError::BadRequest("Empty data provided".to_string()));
    }
    let incomplete = incomplete_records(&records);
    if !incomplete.is_empty() {
        let indices: Vec<String> = incomplete.iter().map(ToString::to_string).collect();
        return Err(ServerError::BadRequest(format!(
            "Incomplete records (null or missing values) at indices: {}",
            indices.join(", ")
        )));
    }
    debug!(records = records.len(), "Prediction request");

    let loaded = state.current().ok_or(ServerError::ModelNotLoaded)?;
    let predictions = tokio::task::spawn_blocking(move || {
        let frame = records_to_frame(&records)?;
        score_with_model(&loaded.model, frame)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("Task join error: {e}")))?
    .map_err(|e| ServerError::Prediction(e.to_string()))?;

    info!(count = predictions.len(), "Generated predictions");
    Ok(Json(json!({ "predictions": predictions })))
}

/// Extract the `data` array from a request body.
fn parse_records(body: &[u8]) -> Result<Vec<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ServerError::BadRequest(NO_DATA.to_string()));
    }
    let mut request: Value = serde_json::from_slice(body)
        .map_err(|e| ServerError::BadRequest(format!("Invalid JSON: {e}")))?;

    match request.get_mut("data").map(Value::take) {
        Some(Value::Array(records)) => Ok(records),
        _ => Err(ServerError::BadRequest(NO_DATA.to_string())),
    }
}

/// Indices of object records holding a null, or lacking a field another
/// record has. One prediction is returned per record, so these are rejected
/// rather than dropped during cleaning.
fn incomplete_records(records: &[Value]) -> Vec<usize> {
    let fields: BTreeSet<&str> = records
        .iter()
        .filter_map(Value::as_object)
        .flat_map(|obj| obj.keys().map(String::as_str))
        .collect();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| match record.as_object() {
            Some(obj) => {
                obj.values().any(Value::is_null) || fields.iter().any(|f| !obj.contains_key(*f))
            }
            None => false,
        })
        .map(|(idx, _)| idx)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        assert_eq!(parse_records(br#"{"data": [{"a": 1}]}"#).unwrap().len(), 1);
        assert!(parse_records(br#"{"data": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_records_rejects_missing_data() {
        let bodies: [&[u8]; 5] = [b"", b"  ", br#"{"rows": []}"#, br#"{"data": {"a": 1}}"#, b"[1, 2]"];
        for body in bodies {
            let err = parse_records(body).unwrap_err();
            assert_eq!(err.to_string(), NO_DATA);
        }
    }

    #[test]
    fn test_parse_records_reports_invalid_json() {
        let err = parse_records(b"{data").unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }

    #[test]
    fn test_incomplete_records_flags_nulls_and_absent_fields() {
        let records = vec![
            json!({"a": 1, "b": "x"}),
            json!({"a": null, "b": "x"}),
            json!({"a": 2, "b": "y"}),
            json!({"b": "z"}),
        ];
        assert_eq!(incomplete_records(&records), vec![1, 3]);
    }

    #[test]
    fn test_incomplete_records_accepts_complete_batch() {
        let records = vec![json!({"a": 1}), json!({"a": 2.5})];
        assert!(incomplete_records(&records).is_empty());
    }
}
