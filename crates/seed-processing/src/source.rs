//! Reading raw sales records into a [`DataFrame`].
//!
//! Two entry points: [`DataSource`] for delimited files on disk and
//! [`records_to_frame`] for JSON records arriving over HTTP.

use crate::error::{ProcessingError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default training file name.
pub const DEFAULT_TRAINING_FILE: &str = "case_study_data.csv";

/// A local CSV file with a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSource {
    path: PathBuf,
}

impl Default for DataSource {
    fn default() -> Self {
        Self::new(DEFAULT_TRAINING_FILE)
    }
}

impl DataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file.
    ///
    /// Tries a quote-aware reader first and falls back to a plain one.
    pub fn read_local(&self) -> Result<DataFrame> {
        if !self.path.exists() {
            return Err(ProcessingError::SourceNotFound(
                self.path.display().to_string(),
            ));
        }

        let df = match CsvReadOptions::default()
            .with_infer_schema_length(Some(100))
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
            .try_into_reader_with_file_path(Some(self.path.clone()))?
            .finish()
        {
            Ok(df) => df,
            Err(e) => {
                debug!("Quote-aware loading failed: {}", e);
                CsvReadOptions::default()
                    .with_infer_schema_length(Some(100))
                    .with_has_header(true)
                    .try_into_reader_with_file_path(Some(self.path.clone()))?
                    .finish()
                    .context(format!("Reading {}", self.path.display()))?
            }
        };

        info!(
            path = %self.path.display(),
            rows = df.height(),
            columns = df.width(),
            "Data sourced"
        );
        Ok(df)
    }
}

/// Build a table from JSON records (one object per row).
///
/// Columns appear in first-seen key order. A column whose non-null values are
/// all integers becomes Int64, all numbers Float64, anything else String.
/// Missing keys and JSON `null` become nulls.
pub fn records_to_frame(records: &[Value]) -> Result<DataFrame> {
    if records.is_empty() {
        return Err(ProcessingError::InvalidData(
            "record list is empty".to_string(),
        ));
    }

    let mut objects = Vec::with_capacity(records.len());
    let mut names: Vec<String> = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let obj = record.as_object().ok_or_else(|| {
            ProcessingError::InvalidData(format!("record {idx} is not a JSON object"))
        })?;
        for key in obj.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
        objects.push(obj);
    }

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        let cells: Vec<Option<&Value>> = objects
            .iter()
            .map(|obj| obj.get(name).filter(|v| !v.is_null()))
            .collect();
        columns.push(json_column(name, &cells).into_column());
    }

    Ok(DataFrame::new(columns)?)
}

fn json_column(name: &str, cells: &[Option<&Value>]) -> Series {
    let present = || cells.iter().flatten();

    if present().all(|v| v.is_i64()) {
        let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(Value::as_i64)).collect();
        return Series::new(name.into(), values);
    }
    if present().all(|v| v.is_number()) {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(Value::as_f64)).collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells
        .iter()
        .map(|c| {
            c.map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
        .collect();
    Series::new(name.into(), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_to_frame_infers_types() {
        let records = vec![
            json!({"PRODUCT": "A", "PLANT_HEIGHT": 3, "RELATIVE_MATURITY": 1.5}),
            json!({"PRODUCT": "B", "PLANT_HEIGHT": 4, "RELATIVE_MATURITY": 2}),
        ];
        let df = records_to_frame(&records).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("PRODUCT").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("PLANT_HEIGHT").unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            df.column("RELATIVE_MATURITY").unwrap().dtype(),
            &DataType::Float64
        );
    }

    #[test]
    fn test_records_to_frame_missing_keys_become_null() {
        let records = vec![
            json!({"PRODUCT": "A", "STATE": "IA"}),
            json!({"PRODUCT": "B", "STATE": null}),
            json!({"PRODUCT": "C"}),
        ];
        let df = records_to_frame(&records).unwrap();
        assert_eq!(df.column("STATE").unwrap().null_count(), 2);
    }

    #[test]
    fn test_records_to_frame_rejects_non_objects() {
        let err = records_to_frame(&[json!([1, 2, 3])]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");

        let err = records_to_frame(&[]).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_read_local_missing_file() {
        let err = DataSource::new("does/not/exist.csv").read_local().unwrap_err();
        assert!(matches!(err, ProcessingError::SourceNotFound(_)));
    }
}
