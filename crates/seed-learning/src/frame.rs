//! Learning-side view of a feature table.
//!
//! A [`FeatureFrame`] is a polars table reduced to what the encoders need:
//! ordered named columns that are either numeric or categorical.

use crate::error::{LearningError, Result};
use polars::prelude::*;
use seed_processing::utils::{column_names, is_numeric_dtype, is_text_dtype, numeric_values, text_values};
use serde::{Deserialize, Serialize};

/// Values of one feature column.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureColumn {
    /// Nulls become NaN and are imputed by the encoder.
    Numeric(Vec<f64>),
    Categorical(Vec<String>),
}

impl FeatureColumn {
    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Numeric(v) => v.len(),
            FeatureColumn::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn take(&self, idx: &[usize]) -> Self {
        match self {
            FeatureColumn::Numeric(v) => FeatureColumn::Numeric(idx.iter().map(|&i| v[i]).collect()),
            FeatureColumn::Categorical(v) => {
                FeatureColumn::Categorical(idx.iter().map(|&i| v[i].clone()).collect())
            }
        }
    }
}

/// How each column is encoded.
///
/// `ordinal` and `target_encoded` are disjoint and together cover every
/// categorical column; `numeric` holds the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSplit {
    pub target_encoded: Vec<String>,
    pub ordinal: Vec<String>,
    pub numeric: Vec<String>,
}

/// Ordered, typed feature columns with a common row count.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    names: Vec<String>,
    columns: Vec<FeatureColumn>,
    n_rows: usize,
}

impl FeatureFrame {
    /// Convert every column of `df`.
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let names = column_names(df);
        Self::from_columns(df, &names)
    }

    /// Convert the named columns of `df`, in the given order.
    ///
    /// # Errors
    ///
    /// [`LearningError::MissingFeatures`] lists every absent name.
    pub fn select(df: &DataFrame, names: &[String]) -> Result<Self> {
        let missing: Vec<String> = names
            .iter()
            .filter(|n| df.column(n.as_str()).is_err())
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(LearningError::MissingFeatures(missing));
        }
        Self::from_columns(df, names)
    }

    /// Split `df` into features (every column but the target) and target values.
    pub fn with_target(df: &DataFrame, target: &str) -> Result<(Self, Vec<f64>)> {
        if df.column(target).is_err() {
            return Err(LearningError::TargetNotFound(target.to_string()));
        }
        let dtype = df.column(target)?.dtype().clone();
        if !is_numeric_dtype(&dtype) {
            return Err(LearningError::InvalidData(format!(
                "target column '{target}' must be numeric, found {dtype}"
            )));
        }

        let y = numeric_values(df, target)?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                v.filter(|v| v.is_finite()).ok_or_else(|| {
                    LearningError::InvalidData(format!(
                        "target column '{target}' has a missing or non-finite value at row {row}"
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let names: Vec<String> = column_names(df)
            .into_iter()
            .filter(|n| n != target)
            .collect();
        Ok((Self::from_columns(df, &names)?, y))
    }

    fn from_columns(df: &DataFrame, names: &[String]) -> Result<Self> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let dtype = df.column(name.as_str())?.dtype().clone();
            let column = if is_numeric_dtype(&dtype) || dtype == DataType::Boolean {
                FeatureColumn::Numeric(
                    numeric_values(df, name)?
                        .into_iter()
                        .map(|v| v.unwrap_or(f64::NAN))
                        .collect(),
                )
            } else if is_text_dtype(&dtype) {
                let values = text_values(df, name)?;
                if values.iter().any(Option::is_none) {
                    return Err(LearningError::InvalidData(format!(
                        "categorical column '{name}' contains nulls"
                    )));
                }
                FeatureColumn::Categorical(values.into_iter().flatten().collect())
            } else {
                return Err(LearningError::InvalidData(format!(
                    "column '{name}' has unsupported dtype {dtype}"
                )));
            };
            columns.push(column);
        }

        Ok(Self {
            names: names.to_vec(),
            columns,
            n_rows: df.height(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&FeatureColumn> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureColumn)> {
        self.names.iter().map(String::as_str).zip(&self.columns)
    }

    /// Rows at `idx`, in that order.
    pub fn take(&self, idx: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(idx)).collect(),
            n_rows: idx.len(),
        }
    }

    /// Assign each column an encoding; categorical columns named in
    /// `ordinal_columns` are ordinal, other categorical columns are target encoded.
    pub fn split_columns(&self, ordinal_columns: &[String]) -> ColumnSplit {
        let mut split = ColumnSplit::default();
        for (name, column) in self.iter() {
            match column {
                FeatureColumn::Numeric(_) => split.numeric.push(name.to_string()),
                FeatureColumn::Categorical(_) if ordinal_columns.iter().any(|o| o == name) => {
                    split.ordinal.push(name.to_string())
                }
                FeatureColumn::Categorical(_) => split.target_encoded.push(name.to_string()),
            }
        }
        split
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df! {
            "PRODUCT" => ["P1", "P2", "P3"],
            "LIFECYCLE" => ["INTRODUCTION", "ESTABLISHED", "PHASEOUT"],
            "PLANT_HEIGHT" => [3i64, 4, 5],
            "UNITS" => [10.0, 20.0, 30.0],
        }
        .unwrap()
    }

    #[test]
    fn test_with_target_separates_columns() {
        let (frame, y) = FeatureFrame::with_target(&sample(), "UNITS").unwrap();
        assert_eq!(frame.names(), &["PRODUCT", "LIFECYCLE", "PLANT_HEIGHT"]);
        assert_eq!(y, vec![10.0, 20.0, 30.0]);
        assert_eq!(frame.n_rows(), 3);
    }

    #[test]
    fn test_missing_target() {
        let err = FeatureFrame::with_target(&sample(), "SALES").unwrap_err();
        assert!(matches!(err, LearningError::TargetNotFound(name) if name == "SALES"));
    }

    #[test]
    fn test_split_columns() {
        let frame = FeatureFrame::from_frame(&sample()).unwrap();
        let split = frame.split_columns(&["LIFECYCLE".to_string()]);
        assert_eq!(split.target_encoded, vec!["PRODUCT"]);
        assert_eq!(split.ordinal, vec!["LIFECYCLE"]);
        assert_eq!(split.numeric, vec!["PLANT_HEIGHT", "UNITS"]);
    }

    #[test]
    fn test_select_reports_all_missing() {
        let names = vec!["PRODUCT".to_string(), "STATE".to_string(), "BRITTLE_STALK".to_string()];
        let err = FeatureFrame::select(&sample(), &names).unwrap_err();
        match err {
            LearningError::MissingFeatures(missing) => {
                assert_eq!(missing, vec!["STATE", "BRITTLE_STALK"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_take_reorders_rows() {
        let frame = FeatureFrame::from_frame(&sample()).unwrap().take(&[2, 0]);
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(
            frame.column("PLANT_HEIGHT"),
            Some(&FeatureColumn::Numeric(vec![5.0, 3.0]))
        );
    }
}
