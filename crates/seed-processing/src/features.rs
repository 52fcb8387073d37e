//! Domain feature derivation.
//!
//! Every derived column is declared in [`DERIVED_FEATURES`] together with the
//! columns it reads. Before anything is computed the declarations are resolved
//! against the input schema into a [`FeaturePlan`]; derivations whose inputs
//! are missing (directly, or because the derived column they read was itself
//! skipped) are listed in [`FeaturePlan::skipped`] and never run.
//!
//! Ratios divide with IEEE semantics: a zero plant height yields `inf` or
//! `NaN` rather than an error. Group means are taken over the whole table
//! passed in, so they are the only derivations that depend on other rows.

use crate::error::{Result, ResultExt};
use crate::utils::{column_names, format_number, numeric_values, text_values};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Columns removed after derivation when present.
pub const DROPPED_COLUMNS: [&str; 2] = ["SALESYEAR", "RELEASEYEAR"];

type DeriveFn = fn(&str, &DataFrame) -> Result<Series>;

/// A column computed from other columns.
pub struct DerivedFeature {
    pub name: &'static str,
    pub requires: &'static [&'static str],
    derive: DeriveFn,
}

impl std::fmt::Debug for DerivedFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedFeature")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish()
    }
}

/// All derivations, in the order they are applied.
pub static DERIVED_FEATURES: &[DerivedFeature] = &[
    DerivedFeature {
        name: "PRODUCT_AGE",
        requires: &["SALESYEAR", "RELEASE_YEAR"],
        derive: |name, df| binary(name, df, "SALESYEAR", "RELEASE_YEAR", |s, r| s - r),
    },
    DerivedFeature {
        name: "PLANT_HEIGHT_SQ",
        requires: &["PLANT_HEIGHT"],
        derive: |name, df| unary(name, df, "PLANT_HEIGHT", |h| h.powi(2)),
    },
    DerivedFeature {
        name: "PLANT_HEIGHT_CUBE",
        requires: &["PLANT_HEIGHT"],
        derive: |name, df| unary(name, df, "PLANT_HEIGHT", |h| h.powi(3)),
    },
    DerivedFeature {
        name: "PRODUCT_STATE",
        requires: &["PRODUCT", "STATE"],
        derive: |name, df| concat_text(name, df, "PRODUCT", "_", "STATE"),
    },
    DerivedFeature {
        name: "STATE_AVG_PLANT_HEIGHT",
        requires: &["STATE", "PLANT_HEIGHT"],
        derive: |name, df| group_mean(name, df, "STATE", "PLANT_HEIGHT"),
    },
    DerivedFeature {
        name: "STATE_AVG_REL_MAT",
        requires: &["STATE", "RELATIVE_MATURITY"],
        derive: |name, df| group_mean(name, df, "STATE", "RELATIVE_MATURITY"),
    },
    DerivedFeature {
        name: "STRUCTURAL_SCORE",
        requires: &["BRITTLE_STALK", "PLANT_HEIGHT"],
        derive: |name, df| {
            binary(name, df, "BRITTLE_STALK", "PLANT_HEIGHT", |b, h| (b + h) / 2.0)
        },
    },
    DerivedFeature {
        name: "DEFENSIVE_INDEX",
        requires: &["DISEASE_RESISTANCE", "INSECT_RESISTANCE", "PROTECTION"],
        derive: |name, df| {
            let disease = numeric_values(df, "DISEASE_RESISTANCE")?;
            let insect = numeric_values(df, "INSECT_RESISTANCE")?;
            let protection = numeric_values(df, "PROTECTION")?;
            let values: Vec<Option<f64>> = disease
                .into_iter()
                .zip(insect)
                .zip(protection)
                .map(|((d, i), p)| Some(d? + i? + p?))
                .collect();
            Ok(Series::new(name.into(), values))
        },
    },
    DerivedFeature {
        name: "STRESS_INDEX",
        // brittleness is scored 0-6, so 6 - x inverts it
        requires: &["DROUGHT_TOLERANCE", "BRITTLE_STALK"],
        derive: |name, df| {
            binary(name, df, "DROUGHT_TOLERANCE", "BRITTLE_STALK", |d, b| d + (6.0 - b))
        },
    },
    DerivedFeature {
        name: "PRODUCT_DEFENSE_SCORE",
        requires: &["PRODUCT", "DEFENSIVE_INDEX"],
        derive: |name, df| concat_text(name, df, "PRODUCT", "_DEF_", "DEFENSIVE_INDEX"),
    },
    DerivedFeature {
        name: "MATURITY_TO_HEIGHT_RATIO",
        requires: &["RELATIVE_MATURITY", "PLANT_HEIGHT"],
        derive: |name, df| binary(name, df, "RELATIVE_MATURITY", "PLANT_HEIGHT", |m, h| m / h),
    },
    DerivedFeature {
        name: "STALK_STRENGTH_TO_HEIGHT",
        requires: &["BRITTLE_STALK", "PLANT_HEIGHT"],
        derive: |name, df| binary(name, df, "BRITTLE_STALK", "PLANT_HEIGHT", |b, h| b / h),
    },
    DerivedFeature {
        name: "STATE_DEFENSE_SCORE",
        requires: &["STATE", "DEFENSIVE_INDEX"],
        derive: |name, df| concat_text(name, df, "STATE", "_DEF_", "DEFENSIVE_INDEX"),
    },
];

/// A derivation that will not run and the inputs it lacked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFeature {
    pub name: &'static str,
    pub missing: Vec<String>,
}

/// Derivations resolved against a schema.
#[derive(Debug)]
pub struct FeaturePlan {
    pub planned: Vec<&'static DerivedFeature>,
    pub skipped: Vec<SkippedFeature>,
}

impl FeaturePlan {
    /// Resolve [`DERIVED_FEATURES`] against the given column names.
    pub fn resolve(columns: &[String]) -> Self {
        let mut available: HashSet<&str> = columns.iter().map(String::as_str).collect();
        let mut planned = Vec::new();
        let mut skipped = Vec::new();

        for feature in DERIVED_FEATURES {
            let missing: Vec<String> = feature
                .requires
                .iter()
                .filter(|col| !available.contains(*col))
                .map(|col| col.to_string())
                .collect();
            if missing.is_empty() {
                available.insert(feature.name);
                planned.push(feature);
            } else {
                skipped.push(SkippedFeature {
                    name: feature.name,
                    missing,
                });
            }
        }

        Self { planned, skipped }
    }

    pub fn planned_names(&self) -> Vec<&'static str> {
        self.planned.iter().map(|f| f.name).collect()
    }
}

/// Result of [`FeatureEngineer::transform`].
#[derive(Debug, Clone)]
pub struct FeatureOutput {
    pub frame: DataFrame,
    pub derived: Vec<&'static str>,
    pub skipped: Vec<SkippedFeature>,
}

/// Stateless feature derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEngineer;

impl FeatureEngineer {
    pub fn new() -> Self {
        Self
    }

    /// The plan [`transform`](Self::transform) would follow for `df`.
    pub fn plan(&self, df: &DataFrame) -> FeaturePlan {
        FeaturePlan::resolve(&column_names(df))
    }

    /// Derive every feature whose inputs are present, then drop
    /// [`DROPPED_COLUMNS`].
    pub fn transform(&self, mut df: DataFrame) -> Result<FeatureOutput> {
        let plan = self.plan(&df);
        for skipped in &plan.skipped {
            warn!(feature = skipped.name, missing = ?skipped.missing, "Skipping derived feature");
        }

        for feature in &plan.planned {
            let series = (feature.derive)(feature.name, &df)
                .context(format!("Deriving {}", feature.name))?;
            df.with_column(series)?;
            debug!(feature = feature.name, "Derived feature");
        }

        let present: Vec<PlSmallStr> = DROPPED_COLUMNS
            .iter()
            .filter(|col| df.get_column_index(col).is_some())
            .map(|col| (*col).into())
            .collect();
        if !present.is_empty() {
            df = df.drop_many(present);
        }

        info!(
            derived = plan.planned.len(),
            skipped = plan.skipped.len(),
            columns = df.width(),
            "Feature engineering completed"
        );
        Ok(FeatureOutput {
            frame: df,
            derived: plan.planned_names(),
            skipped: plan.skipped,
        })
    }

    /// Convenience wrapper returning only the augmented table.
    pub fn feature_engineering(&self, df: DataFrame) -> Result<DataFrame> {
        Ok(self.transform(df)?.frame)
    }
}

// =============================================================================
// Derivation helpers
// =============================================================================

fn unary(name: &str, df: &DataFrame, col: &str, f: impl Fn(f64) -> f64) -> Result<Series> {
    let values: Vec<Option<f64>> = numeric_values(df, col)?
        .into_iter()
        .map(|v| v.map(&f))
        .collect();
    Ok(Series::new(name.into(), values))
}

fn binary(
    name: &str,
    df: &DataFrame,
    left: &str,
    right: &str,
    f: impl Fn(f64, f64) -> f64,
) -> Result<Series> {
    let lhs = numeric_values(df, left)?;
    let rhs = numeric_values(df, right)?;
    let values: Vec<Option<f64>> = lhs
        .into_iter()
        .zip(rhs)
        .map(|(a, b)| Some(f(a?, b?)))
        .collect();
    Ok(Series::new(name.into(), values))
}

/// `left + sep + right` row-wise; numeric columns render via [`format_number`].
fn concat_text(name: &str, df: &DataFrame, left: &str, sep: &str, right: &str) -> Result<Series> {
    let lhs = render_text(df, left)?;
    let rhs = render_text(df, right)?;
    let values: Vec<Option<String>> = lhs
        .into_iter()
        .zip(rhs)
        .map(|(a, b)| Some(format!("{}{sep}{}", a?, b?)))
        .collect();
    Ok(Series::new(name.into(), values))
}

fn render_text(df: &DataFrame, col: &str) -> Result<Vec<Option<String>>> {
    let dtype = crate::utils::require_column(df, col)?.dtype().clone();
    if crate::utils::is_numeric_dtype(&dtype) {
        Ok(numeric_values(df, col)?
            .into_iter()
            .map(|v| v.map(format_number))
            .collect())
    } else {
        text_values(df, col)
    }
}

/// Mean of `value_col` within each `group_col` value, broadcast to every row.
fn group_mean(name: &str, df: &DataFrame, group_col: &str, value_col: &str) -> Result<Series> {
    let groups = text_values(df, group_col)?;
    let values = numeric_values(df, value_col)?;

    let mut totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for (group, value) in groups.iter().zip(&values) {
        if let (Some(group), Some(value)) = (group, value) {
            let entry = totals.entry(group.as_str()).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    let means: Vec<Option<f64>> = groups
        .iter()
        .map(|group| {
            group
                .as_deref()
                .and_then(|g| totals.get(g))
                .filter(|(_, count)| *count > 0)
                .map(|(sum, count)| sum / *count as f64)
        })
        .collect();
    Ok(Series::new(name.into(), means))
}
