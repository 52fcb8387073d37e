//! Integration tests for sourcing, cleaning and feature derivation.

use pretty_assertions::assert_eq;
use polars::prelude::*;
use seed_processing::utils::{column_names, numeric_values};
use seed_processing::{DataSource, FeatureEngineer, LifecycleStage, PreprocessConfig, Preprocessor};
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture(filename: &str) -> DataFrame {
    DataSource::new(fixtures_path().join(filename))
        .read_local()
        .expect("Failed to read fixture")
}

fn scenario_frame() -> DataFrame {
    df! {
        "PRODUCT" => ["A", "A", "A"],
        "STATE" => ["IA", "IA", "IA"],
        "LIFECYCLE" => ["ESTABLISHED", "ESTABLISHED", "ESTABLISHED"],
        "PLANT_HEIGHT" => [4i64, 4, 5],
        "UNITS" => [5i64, 5, 100],
    }
    .unwrap()
}

// ============================================================================
// Fit mode
// ============================================================================

#[test]
fn test_fit_on_fixture() {
    let raw = load_fixture("seed_sales.csv");
    assert_eq!(raw.height(), 63);

    let out = Preprocessor::default().fit(raw).unwrap();
    let summary = &out.summary;

    assert_eq!(summary.duplicates_removed, 1);
    assert_eq!(summary.missing.unwrap().rows_after, 61);
    assert_eq!(summary.groups_collapsed, 0);
    let bounds = summary.outliers.unwrap();
    assert_eq!(bounds.q1, 107.0);
    assert_eq!(bounds.q3, 157.0);
    assert_eq!(bounds.removed, 1);
    assert_eq!(out.frame.height(), 60);

    let units = numeric_values(&out.frame, "UNITS").unwrap();
    assert!(units.iter().flatten().all(|&u| u < 5000.0));
}

#[test]
fn test_aggregation_then_outlier_scenario() {
    // The two UNITS=5 rows share every feature value; the UNITS=100 row has a
    // different PLANT_HEIGHT, so it forms its own group.
    let pre = Preprocessor::default();
    let mut df = scenario_frame();

    pre.handle_aggregations(&mut df).unwrap();
    let units = numeric_values(&df, "UNITS").unwrap();
    assert_eq!(units, vec![Some(10.0), Some(100.0)]);

    // Linear quantiles over {10, 100}: Q1 = 32.5, Q3 = 77.5, IQR = 45,
    // bounds [-35, 145], so both rows stay.
    let bounds = pre.handle_outliers(&mut df).unwrap().unwrap();
    assert_eq!(bounds.q1, 32.5);
    assert_eq!(bounds.q3, 77.5);
    assert_eq!(bounds.iqr, 45.0);
    assert_eq!(bounds.lower, -35.0);
    assert_eq!(bounds.upper, 145.0);
    assert_eq!(df.height(), 2);
}

#[test]
fn test_aggregation_invariant_one_row_per_combination() {
    let mut df = load_fixture("seed_sales.csv");
    let pre = Preprocessor::default();
    pre.handle_duplicates(&mut df).unwrap();
    pre.handle_missing_values(&mut df).unwrap();

    // Duplicate every row so each combination appears twice.
    let doubled = df.vstack(&df).unwrap();
    let mut aggregated = doubled.clone();
    pre.handle_aggregations(&mut aggregated).unwrap();

    let keys: Vec<String> = column_names(&aggregated)
        .into_iter()
        .filter(|c| c != "UNITS")
        .collect();
    let distinct = aggregated
        .unique_stable(Some(&keys), UniqueKeepStrategy::First, None)
        .unwrap();
    assert_eq!(distinct.height(), aggregated.height());
    assert_eq!(aggregated.height(), df.height());

    let original = numeric_values(&df, "UNITS").unwrap();
    let summed = numeric_values(&aggregated, "UNITS").unwrap();
    for (o, s) in original.iter().zip(&summed) {
        assert_eq!(s.unwrap(), 2.0 * o.unwrap());
    }
}

#[test]
fn test_outlier_bound_holds_for_retained_rows() {
    let mut df = load_fixture("seed_sales.csv");
    let pre = Preprocessor::default();
    pre.handle_missing_values(&mut df).unwrap();

    let bounds = pre.handle_outliers(&mut df).unwrap().unwrap();
    for u in numeric_values(&df, "UNITS").unwrap().into_iter().flatten() {
        assert!(u >= bounds.lower && u <= bounds.upper);
    }
}

#[test]
fn test_lifecycle_monotonic_when_enabled() {
    let config = PreprocessConfig::builder()
        .enforce_lifecycle_order(true)
        .build()
        .unwrap();
    let out = Preprocessor::new(config)
        .fit(load_fixture("seed_sales.csv"))
        .unwrap();
    assert!(out.summary.lifecycle_violations.is_some());

    let df = &out.frame;
    let products = seed_processing::utils::text_values(df, "PRODUCT").unwrap();
    let stages = seed_processing::utils::text_values(df, "LIFECYCLE").unwrap();
    let mut last: std::collections::HashMap<String, i64> = Default::default();
    for (p, s) in products.into_iter().zip(stages) {
        let code = LifecycleStage::code_of(&s.unwrap()).unwrap();
        let prev = last.entry(p.unwrap()).or_insert(code);
        assert!(code >= *prev);
        *prev = code;
    }
}

// ============================================================================
// Score mode
// ============================================================================

#[test]
fn test_score_mode_is_idempotent() {
    let pre = Preprocessor::default();
    let (once, _) = pre.score(load_fixture("seed_sales.csv")).unwrap();
    let (twice, report) = pre.score(once.clone()).unwrap();

    assert_eq!(report.dropped_percent, 0.0);
    assert!(once.equals_missing(&twice));
}

#[test]
fn test_score_mode_keeps_outliers_and_duplicates() {
    let (df, _) = Preprocessor::default()
        .score(load_fixture("seed_sales.csv"))
        .unwrap();
    assert_eq!(df.height(), 62);
}

// ============================================================================
// Features
// ============================================================================

#[test]
fn test_features_on_scoring_fixture() {
    let raw = load_fixture("seed_scoring.csv");
    let (cleaned, _) = Preprocessor::default().score(raw).unwrap();
    let out = FeatureEngineer::new().transform(cleaned).unwrap();

    assert!(out.skipped.is_empty());
    assert_eq!(out.frame.height(), 4);
    assert!(out.frame.column("SALESYEAR").is_err());
    assert!(out.frame.column("STATE_DEFENSE_SCORE").is_ok());
}

#[test]
fn test_feature_determinism_on_fixture() {
    let fit = || {
        let out = Preprocessor::default()
            .fit(load_fixture("seed_sales.csv"))
            .unwrap();
        FeatureEngineer::new().feature_engineering(out.frame).unwrap()
    };
    assert!(fit().equals_missing(&fit()));
}
