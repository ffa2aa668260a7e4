//! Integration tests for the cleaning pipeline.
//!
//! These tests run the pipeline end to end over the CSV files in
//! `tests/fixtures`.

use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tabclean::{
    BoundsPolicy, CleaningConfig, CleaningStage, ColumnNormalizer, KeepPolicy, LoadOptions,
    NumericImputation, OutlierMethod, Pipeline, load_table, write_table,
};
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(filename: &str) -> PathBuf {
    fixtures_path().join(filename)
}

fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

fn f64_values(df: &DataFrame, col: &str) -> Vec<Option<f64>> {
    df.column(col)
        .expect("column should exist")
        .as_materialized_series()
        .cast(&DataType::Float64)
        .expect("column should be numeric")
        .f64()
        .expect("cast to f64")
        .into_iter()
        .collect()
}

fn run_default(filename: &str) -> tabclean::PipelineResult {
    Pipeline::builder()
        .build()
        .expect("default pipeline should build")
        .run(fixture(filename), None)
        .expect("pipeline should succeed")
}

// ============================================================================
// Worked Example
// ============================================================================

#[test]
fn test_example_table_end_to_end() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clean.csv");

    let result = Pipeline::builder()
        .build()
        .unwrap()
        .run(fixture("example.csv"), Some(&output))
        .unwrap();

    assert_eq!(column_names(&result.data), vec!["age", "cafe_name"]);
    assert_eq!(result.data.height(), 2);
    assert_eq!(result.summary.duplicates_removed, 1);
    assert_eq!(result.summary.imputations[0].column, "age");
    assert_eq!(result.summary.imputations[0].fill_value, "25");
    assert_eq!(result.output_path.as_deref(), Some(output.as_path()));

    let written = std::fs::read_to_string(&output).unwrap();
    assert_eq!(written, "age,cafe_name\n25,A\n25,B\n");
}

// ============================================================================
// Full Pipeline on a Messy File
// ============================================================================

#[test]
fn test_messy_file_default_pipeline() {
    let result = run_default("messy.csv");
    let summary = &result.summary;

    assert_eq!(summary.rows_before, 11);
    assert_eq!(summary.columns_before, 7);
    assert_eq!(summary.dropped_empty_columns, vec!["notes".to_string()]);
    assert_eq!(summary.dropped_sparse_columns, vec!["comment".to_string()]);
    assert_eq!(summary.duplicates_removed, 1);

    assert_eq!(
        column_names(&result.data),
        vec!["id", "full_name", "score_", "joined", "active"]
    );
    assert_eq!(result.data.height(), 10);

    // Every retained column is complete
    for col in result.data.get_columns() {
        assert_eq!(col.null_count(), 0, "column '{}' still has gaps", col.name());
    }

    // Ties between true and false resolve to the smaller string
    let active = summary
        .imputations
        .iter()
        .find(|imp| imp.column == "active")
        .unwrap();
    assert_eq!(active.fill_value, "false");
    assert_eq!(result.data.column("active").unwrap().dtype(), &DataType::Boolean);

    let score = summary
        .imputations
        .iter()
        .find(|imp| imp.column == "score_")
        .unwrap();
    assert_eq!(score.fill_value, "12");
}

#[test]
fn test_messy_file_missing_audit() {
    let result = run_default("messy.csv");
    let initial = &result.summary.missing_initial;

    assert_eq!(initial.columns[0].name, "notes");
    assert_eq!(initial.columns[0].missing_percentage, 100.0);
    assert_eq!(initial.columns[1].name, "comment");
    assert_eq!(initial.get("score_").unwrap().missing_count, 1);
    assert_eq!(initial.get("active").unwrap().missing_count, 1);

    let pruned = &result.summary.missing_after_pruning;
    assert!(pruned.get("notes").is_none());
    assert!(pruned.get("comment").is_some());
}

#[test]
fn test_capped_values_stay_within_bounds() {
    let result = run_default("messy.csv");

    let report = result
        .summary
        .outliers
        .iter()
        .find(|r| r.column == "score_")
        .unwrap();
    assert_eq!(report.above, 1);
    assert_eq!((report.bounds.lower, report.bounds.upper), (9.5, 13.5));

    for value in f64_values(&result.data, "score_").into_iter().flatten() {
        assert!(value >= report.bounds.lower && value <= report.bounds.upper);
    }
    assert!(f64_values(&result.data, "score_").contains(&Some(13.5)));
}

#[test]
fn test_remove_outliers_drops_rows() {
    let config = CleaningConfig::builder()
        .outlier_method(OutlierMethod::Remove)
        .bounds_policy(BoundsPolicy::Snapshot)
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("messy.csv"), None)
        .unwrap();

    assert_eq!(result.data.height(), 9);
    assert_eq!(result.summary.outlier_rows_removed, 1);
    assert!(!f64_values(&result.data, "score_").contains(&Some(1000.0)));
}

#[test]
fn test_datetime_columns_are_parsed() {
    let config = CleaningConfig::builder()
        .datetime_columns(["joined"])
        .day_first(true)
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("messy.csv"), None)
        .unwrap();

    let joined = result.data.column("joined").unwrap();
    assert_eq!(
        joined.dtype(),
        &DataType::Datetime(TimeUnit::Milliseconds, None)
    );
    assert_eq!(joined.null_count(), 1);
    assert_eq!(result.summary.datetime_conversions[0].coerced, 1);
}

#[test]
fn test_keep_none_with_subset() {
    let config = CleaningConfig::builder()
        .duplicate_subset(["id"])
        .keep(KeepPolicy::None)
        .numeric_imputation(NumericImputation::Zero)
        .build()
        .unwrap();

    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("messy.csv"), None)
        .unwrap();

    assert_eq!(result.summary.duplicates_removed, 2);
    let ids = f64_values(&result.data, "id");
    assert!(!ids.contains(&Some(2.0)));
}

// ============================================================================
// Loading and Persistence
// ============================================================================

#[test]
fn test_latin1_semicolon_decimal_comma() {
    let options = LoadOptions::default()
        .with_separator(';')
        .with_encoding("latin1")
        .with_decimal(',');

    let result = Pipeline::builder()
        .load_options(options)
        .build()
        .unwrap()
        .run(fixture("latin1_semicolon.csv"), None)
        .unwrap();

    assert_eq!(column_names(&result.data), vec!["ville", "prix", "quantite"]);
    assert_eq!(result.data.height(), 2);
    assert_eq!(f64_values(&result.data, "prix"), vec![Some(1.5), Some(2.25)]);
}

#[test]
fn test_round_trip_after_normalization() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("normalized.csv");

    let df = load_table(fixture("messy.csv"), &LoadOptions::default()).unwrap();
    let (mut normalized, _) = ColumnNormalizer::normalize(df).unwrap();
    write_table(&mut normalized, &output).unwrap();

    let reloaded = load_table(&output, &LoadOptions::default()).unwrap();
    assert_eq!(column_names(&reloaded), column_names(&normalized));
    assert!(reloaded.equals_missing(&normalized));
}

#[test]
fn test_missing_input_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clean.csv");

    let err = Pipeline::builder()
        .build()
        .unwrap()
        .run(fixture("does_not_exist.csv"), Some(&output))
        .unwrap_err();

    assert_eq!(err.error_code(), "LOAD_ERROR");
    assert!(err.to_string().contains("does_not_exist.csv"));
    assert!(!output.exists());
}

#[test]
fn test_stage_failure_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("clean.csv");

    let config = CleaningConfig::builder()
        .outlier_columns(["full_name"])
        .build()
        .unwrap();

    let err = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .run(fixture("messy.csv"), Some(&output))
        .unwrap_err();

    assert_eq!(err.error_code(), "INVALID_COLUMN_SET");
    assert!(!output.exists());
}

// ============================================================================
// Strategy Parsing
// ============================================================================

#[test]
fn test_unknown_strategy_names() {
    let err = "average".parse::<NumericImputation>().unwrap_err();
    assert_eq!(err.error_code(), "INVALID_STRATEGY");
    assert!(err.to_string().contains("average"));

    assert!("drop".parse::<KeepPolicy>().is_err());
    assert!("clip".parse::<OutlierMethod>().is_err());
    assert_eq!("LAST".parse::<KeepPolicy>().unwrap(), KeepPolicy::Last);
}

// ============================================================================
// Progress and Summary Output
// ============================================================================

#[test]
fn test_progress_covers_every_stage() {
    let dir = TempDir::new().unwrap();
    let stages = Arc::new(Mutex::new(Vec::new()));
    let stages_clone = stages.clone();

    Pipeline::builder()
        .on_progress(move |update| {
            stages_clone.lock().unwrap().push(update.stage);
        })
        .build()
        .unwrap()
        .run(fixture("example.csv"), Some(&dir.path().join("out.csv")))
        .unwrap();

    let mut seen = stages.lock().unwrap().clone();
    seen.dedup();
    assert_eq!(
        seen,
        vec![
            CleaningStage::Loading,
            CleaningStage::NormalizingColumns,
            CleaningStage::AuditingMissing,
            CleaningStage::ResolvingMissing,
            CleaningStage::Deduplicating,
            CleaningStage::NormalizingTypes,
            CleaningStage::HandlingOutliers,
            CleaningStage::Persisting,
            CleaningStage::Complete,
        ]
    );
}

#[test]
fn test_summary_serializes_to_json() {
    let result = run_default("messy.csv");
    let json: serde_json::Value = serde_json::to_value(&result.summary).unwrap();

    assert_eq!(json["rows_before"], 11);
    assert_eq!(json["duplicates_removed"], 1);
    assert_eq!(json["dropped_empty_columns"][0], "notes");
    assert_eq!(json["outliers"][1]["column"], "score_");
    assert_eq!(json["outliers"][1]["action"], "cap");
    assert!(json["actions"].as_array().unwrap().len() > 5);
}
