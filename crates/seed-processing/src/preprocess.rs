//! Cleaning of raw sales records.
//!
//! Training (`fit`) runs duplicates → missing → aggregation → outliers, plus
//! the lifecycle filter when enabled. Scoring (`score`) only drops rows with
//! missing values: aggregation and outlier removal need the target and would
//! break the alignment between input rows and predictions.

use crate::config::PreprocessConfig;
use crate::error::{ProcessingError, Result, ResultExt};
use crate::lifecycle::LifecycleStage;
use crate::utils::{column_names, filter_rows, numeric_values, quantile_linear, text_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

/// Row counts around missing-value removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MissingValueReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Percentage of rows dropped; 0 for an empty input.
    pub dropped_percent: f64,
}

/// Bounds used by the IQR filter and how many rows it removed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
    pub removed: usize,
}

/// What a `fit` run did to the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates_removed: usize,
    pub missing: Option<MissingValueReport>,
    pub groups_collapsed: usize,
    pub outliers: Option<OutlierBounds>,
    pub lifecycle_violations: Option<usize>,
}

/// Output of [`Preprocessor::fit`].
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub frame: DataFrame,
    pub summary: PreprocessSummary,
}

/// Applies the cleaning steps to a record table.
#[derive(Debug, Clone, Default)]
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Training-time cleaning.
    pub fn fit(&self, mut df: DataFrame) -> Result<Preprocessed> {
        let mut summary = PreprocessSummary {
            rows_in: df.height(),
            ..Default::default()
        };
        info!(shape = ?df.shape(), "Preprocessing (fit) started");

        summary.duplicates_removed = self.handle_duplicates(&mut df)?;
        summary.missing = Some(self.handle_missing_values(&mut df)?);
        summary.groups_collapsed = self
            .handle_aggregations(&mut df)
            .context("Aggregating target")?;
        summary.outliers = self
            .handle_outliers(&mut df)
            .context("Removing outliers")?;
        if self.config.enforce_lifecycle_order {
            summary.lifecycle_violations = Some(self.remove_lifecycle_violations(&mut df)?);
        }

        summary.rows_out = df.height();
        info!(shape = ?df.shape(), "Preprocessing (fit) completed");
        Ok(Preprocessed { frame: df, summary })
    }

    /// Scoring-time cleaning: only rows with missing values are dropped.
    pub fn score(&self, mut df: DataFrame) -> Result<(DataFrame, MissingValueReport)> {
        let report = self.handle_missing_values(&mut df)?;
        Ok((df, report))
    }

    /// Remove exact-duplicate rows, keeping the first occurrence.
    ///
    /// Returns the number of rows removed.
    pub fn handle_duplicates(&self, df: &mut DataFrame) -> Result<usize> {
        let before = df.height();
        *df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        let removed = before - df.height();
        debug!(removed, "Removed duplicate rows");
        Ok(removed)
    }

    /// Drop every row holding a null in any column.
    pub fn handle_missing_values(&self, df: &mut DataFrame) -> Result<MissingValueReport> {
        let rows_before = df.height();
        let mut keep = vec![true; rows_before];
        for column in df.get_columns() {
            if column.null_count() == 0 {
                continue;
            }
            let nulls = column.as_materialized_series().is_null();
            for (flag, is_null) in keep.iter_mut().zip(nulls.into_iter()) {
                if is_null.unwrap_or(false) {
                    *flag = false;
                }
            }
        }

        *df = filter_rows(df, &keep)?;
        let rows_after = df.height();
        let dropped_percent = if rows_before == 0 {
            0.0
        } else {
            (1.0 - rows_after as f64 / rows_before as f64) * 100.0
        };

        info!(rows_before, rows_after, dropped_percent, "Dropped rows with missing values");
        Ok(MissingValueReport {
            rows_before,
            rows_after,
            dropped_percent,
        })
    }

    /// Collapse rows sharing every non-target value into one row whose target
    /// is the group sum. Groups keep the position of their first row.
    ///
    /// Returns the number of rows folded into an earlier row.
    pub fn handle_aggregations(&self, df: &mut DataFrame) -> Result<usize> {
        let target = self.config.target_column.as_str();
        let target_dtype = df
            .column(target)
            .map_err(|_| ProcessingError::ColumnNotFound(target.to_string()))?
            .dtype()
            .clone();

        let order: Vec<Expr> = column_names(df).iter().map(|name| col(name.as_str())).collect();
        let keys: Vec<Expr> = column_names(df)
            .iter()
            .filter(|name| name.as_str() != target)
            .map(|name| col(name.as_str()))
            .collect();
        let summed = col(target).sum().cast(target_dtype);

        let before = df.height();
        let lazy = df.clone().lazy();
        let grouped = if keys.is_empty() {
            lazy.select([summed])
        } else {
            lazy.group_by_stable(keys).agg([summed]).select(order)
        };
        *df = grouped.collect()?;

        let collapsed = before - df.height();
        debug!(groups = df.height(), collapsed, "Aggregated target over feature combinations");
        Ok(collapsed)
    }

    /// Keep rows whose target lies within `[Q1 - k*IQR, Q3 + k*IQR]`.
    ///
    /// Quartiles are computed once over the table as passed in. Returns
    /// `None` when the target has no finite values.
    pub fn handle_outliers(&self, df: &mut DataFrame) -> Result<Option<OutlierBounds>> {
        let target = self.config.target_column.as_str();
        let values = numeric_values(df, target)?;

        let mut sorted: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_by(f64::total_cmp);
        let (Some(q1), Some(q3)) = (quantile_linear(&sorted, 0.25), quantile_linear(&sorted, 0.75)) else {
            debug!("No finite target values, skipping outlier filter");
            return Ok(None);
        };

        let iqr = q3 - q1;
        let lower = q1 - self.config.iqr_multiplier * iqr;
        let upper = q3 + self.config.iqr_multiplier * iqr;
        let keep: Vec<bool> = values
            .iter()
            .map(|v| v.is_some_and(|v| v >= lower && v <= upper))
            .collect();

        let before = df.height();
        *df = filter_rows(df, &keep)?;
        let removed = before - df.height();
        info!(q1, q3, iqr, lower, upper, removed, "Removed target outliers");

        Ok(Some(OutlierBounds {
            q1,
            q3,
            iqr,
            lower,
            upper,
            removed,
        }))
    }

    /// Drop rows that move a product backwards in its lifecycle.
    ///
    /// Rows are ordered by entity and time; within an entity a row is dropped
    /// when its stage code is below the highest code already kept. Equal codes
    /// are kept and rows with unknown stages are dropped. The result is sorted
    /// by entity, time and stage. Returns the number of rows removed.
    pub fn remove_lifecycle_violations(&self, df: &mut DataFrame) -> Result<usize> {
        let entities = text_values(df, &self.config.entity_column)?;
        let times = numeric_values(df, &self.config.time_column)?;
        let codes: Vec<Option<i64>> = text_values(df, &self.config.lifecycle_column)?
            .into_iter()
            .map(|label| label.and_then(|l| LifecycleStage::code_of(&l)))
            .collect();

        let mut order: Vec<usize> = (0..df.height()).collect();
        order.sort_by(|&a, &b| {
            entities[a]
                .cmp(&entities[b])
                .then_with(|| compare_time(times[a], times[b]))
        });

        let mut max_seen: HashMap<Option<&str>, i64> = HashMap::new();
        let mut kept: Vec<usize> = Vec::with_capacity(order.len());
        for idx in order {
            let Some(code) = codes[idx] else {
                continue;
            };
            let max_code = max_seen.entry(entities[idx].as_deref()).or_insert(-1);
            if code < *max_code {
                continue;
            }
            *max_code = code;
            kept.push(idx);
        }

        kept.sort_by(|&a, &b| {
            entities[a]
                .cmp(&entities[b])
                .then_with(|| compare_time(times[a], times[b]))
                .then_with(|| codes[a].cmp(&codes[b]))
        });

        let removed = df.height() - kept.len();
        let indices = IdxCa::from_vec(
            "idx".into(),
            kept.into_iter().map(|i| i as IdxSize).collect(),
        );
        *df = df.take(&indices)?;
        info!(removed, "Removed lifecycle violations");
        Ok(removed)
    }
}

fn compare_time(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
