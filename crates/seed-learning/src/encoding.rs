//! Turning a [`FeatureFrame`] into a numeric design matrix.

use crate::error::{LearningError, Result};
use crate::frame::{ColumnSplit, FeatureColumn, FeatureFrame};
use ndarray::Array2;
use seed_processing::LifecycleStage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Smoothed mean-target encoding for one categorical column.
///
/// Categories seen often lean on their own mean; rare ones shrink toward the
/// global mean. Unseen categories encode as the global mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoder {
    prior: f64,
    mapping: BTreeMap<String, f64>,
}

impl TargetEncoder {
    pub const MIN_SAMPLES_LEAF: f64 = 20.0;
    pub const SMOOTHING: f64 = 10.0;

    pub fn fit(values: &[String], y: &[f64]) -> Self {
        let prior = if y.is_empty() {
            0.0
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        };

        let mut stats: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for (value, target) in values.iter().zip(y) {
            let entry = stats.entry(value.as_str()).or_insert((0.0, 0));
            entry.0 += target;
            entry.1 += 1;
        }

        let mapping = stats
            .into_iter()
            .map(|(value, (sum, count))| {
                let mean = sum / count as f64;
                let weight =
                    1.0 / (1.0 + (-(count as f64 - Self::MIN_SAMPLES_LEAF) / Self::SMOOTHING).exp());
                (value.to_string(), prior * (1.0 - weight) + mean * weight)
            })
            .collect();

        Self { prior, mapping }
    }

    pub fn encode(&self, value: &str) -> f64 {
        self.mapping.get(value).copied().unwrap_or(self.prior)
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }
}

/// Lifecycle stage code; unknown labels encode as -1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrdinalEncoder;

impl OrdinalEncoder {
    pub fn encode(&self, value: &str) -> f64 {
        LifecycleStage::code_of(value).map_or(-1.0, |c| c as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ColumnTransform {
    Target(TargetEncoder),
    Ordinal,
    /// Non-finite values are replaced by `fill`.
    Numeric { fill: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct EncodedColumn {
    name: String,
    transform: ColumnTransform,
}

/// Per-column encoders fitted on training rows.
///
/// Output columns follow the order of the frame the encoder was fitted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEncoder {
    columns: Vec<EncodedColumn>,
}

impl ColumnEncoder {
    pub fn fit(frame: &FeatureFrame, y: &[f64], split: &ColumnSplit) -> Result<Self> {
        if frame.n_rows() != y.len() {
            return Err(LearningError::InvalidData(format!(
                "feature rows ({}) and target length ({}) differ",
                frame.n_rows(),
                y.len()
            )));
        }

        let mut columns = Vec::with_capacity(frame.n_columns());
        for (name, column) in frame.iter() {
            let transform = match column {
                FeatureColumn::Categorical(_) if split.ordinal.iter().any(|c| c == name) => {
                    ColumnTransform::Ordinal
                }
                FeatureColumn::Categorical(values) => {
                    ColumnTransform::Target(TargetEncoder::fit(values, y))
                }
                FeatureColumn::Numeric(values) => ColumnTransform::Numeric {
                    fill: finite_median(values),
                },
            };
            columns.push(EncodedColumn {
                name: name.to_string(),
                transform,
            });
        }
        Ok(Self { columns })
    }

    /// Encode `frame` into a row-major design matrix.
    ///
    /// Columns are looked up by name, so `frame` may order them differently
    /// from the training frame.
    pub fn transform(&self, frame: &FeatureFrame) -> Result<Array2<f64>> {
        let n_rows = frame.n_rows();
        let mut x = Array2::zeros((n_rows, self.columns.len()));

        for (j, encoded) in self.columns.iter().enumerate() {
            let column = frame
                .column(&encoded.name)
                .ok_or_else(|| LearningError::MissingFeatures(vec![encoded.name.clone()]))?;

            match (&encoded.transform, column) {
                (ColumnTransform::Target(enc), FeatureColumn::Categorical(values)) => {
                    for (i, v) in values.iter().enumerate() {
                        x[[i, j]] = enc.encode(v);
                    }
                }
                (ColumnTransform::Ordinal, FeatureColumn::Categorical(values)) => {
                    for (i, v) in values.iter().enumerate() {
                        x[[i, j]] = OrdinalEncoder.encode(v);
                    }
                }
                (ColumnTransform::Numeric { fill }, FeatureColumn::Numeric(values)) => {
                    for (i, &v) in values.iter().enumerate() {
                        x[[i, j]] = if v.is_finite() { v } else { *fill };
                    }
                }
                _ => {
                    return Err(LearningError::InvalidData(format!(
                        "column '{}' changed between numeric and categorical since fitting",
                        encoded.name
                    )));
                }
            }
        }
        Ok(x)
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Median of the finite values, 0.0 when there are none.
fn finite_median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return 0.0;
    }
    finite.sort_by(f64::total_cmp);
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) / 2.0
    } else {
        finite[mid]
    }
}
