//! Shared helpers used across the cleaning stages.

use crate::config::QuantileInterpolation;
use crate::error::{CleaningError, Result};
use polars::prelude::*;
use std::collections::BTreeMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Semantic category of a column's data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date or datetime types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Column where every value is missing and no type was inferred
    Null,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a date/time type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else if matches!(dtype, DataType::Null) {
        DtypeCategory::Null
    } else {
        DtypeCategory::Other
    }
}

/// Human-readable name of a dtype category.
pub fn dtype_category_str(dtype: &DataType) -> &'static str {
    match get_dtype_category(dtype) {
        DtypeCategory::Numeric => "numeric",
        DtypeCategory::Datetime => "datetime",
        DtypeCategory::Boolean => "boolean",
        DtypeCategory::String => "string",
        DtypeCategory::Null => "null",
        DtypeCategory::Other => "other",
    }
}

// =============================================================================
// Frame Utilities
// =============================================================================

/// Owned column names in table order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Fail with [`CleaningError::InvalidColumnSet`] unless every name is a column of `df`.
pub fn ensure_columns_exist(df: &DataFrame, columns: &[String], purpose: &str) -> Result<()> {
    let existing = column_names(df);
    let missing: Vec<&String> = columns
        .iter()
        .filter(|col| !existing.contains(col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleaningError::InvalidColumnSet(format!(
            "{purpose} references columns not in the table: {missing:?} (available: {existing:?})"
        )))
    }
}

/// Row-aligned `Option<String>` view of any series; `None` marks a missing value.
pub fn string_values(series: &Series) -> Result<Vec<Option<String>>> {
    let str_series = series.cast(&DataType::String)?;
    Ok(str_series
        .str()?
        .into_iter()
        .map(|opt| opt.map(str::to_string))
        .collect())
}

// =============================================================================
// Statistics
// =============================================================================

/// Quantile `q` (0.0 - 1.0) of the non-missing values of a numeric series.
///
/// Returns `None` when the series has no values.
pub fn series_quantile(
    series: &Series,
    q: f64,
    interpolation: QuantileInterpolation,
) -> Result<Option<f64>> {
    let float_series = series.cast(&DataType::Float64)?;
    let scalar = float_series.quantile_reduce(q, interpolation.into())?;
    Ok(scalar.value().extract::<f64>())
}

/// Most frequent non-missing value of a series, compared on its string form.
///
/// Ties go to the lexicographically smallest value.
pub fn string_mode(series: &Series) -> Result<Option<String>> {
    let mut value_counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in string_values(series)?.into_iter().flatten() {
        *value_counts.entry(value).or_insert(0) += 1;
    }

    let mut best: Option<(String, usize)> = None;
    for (value, count) in value_counts {
        if best.as_ref().is_none_or(|(_, best_count)| count > *best_count) {
            best = Some((value, count));
        }
    }

    Ok(best.map(|(value, _)| value))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(get_dtype_category(&DataType::Null), DtypeCategory::Null);
        assert_eq!(dtype_category_str(&DataType::Float32), "numeric");
    }

    fn sample_series() -> Series {
        Series::new("x".into(), &[Some(100i64), Some(5), None, Some(4), Some(3), Some(2), Some(1)])
    }

    #[test]
    fn test_quantile_linear() {
        let series = sample_series();
        let q = |p| series_quantile(&series, p, QuantileInterpolation::Linear).unwrap();
        assert_eq!(q(0.25), Some(2.25));
        assert_eq!(q(0.75), Some(4.75));
        assert_eq!(q(0.5), Some(3.5));
    }

    #[test]
    fn test_quantile_other_interpolations() {
        let series = sample_series();
        let q = |p, interpolation| series_quantile(&series, p, interpolation).unwrap();
        assert_eq!(q(0.25, QuantileInterpolation::Lower), Some(2.0));
        assert_eq!(q(0.75, QuantileInterpolation::Lower), Some(4.0));
        assert_eq!(q(0.25, QuantileInterpolation::Higher), Some(3.0));
        assert_eq!(q(0.25, QuantileInterpolation::Midpoint), Some(2.5));
        assert_eq!(q(0.25, QuantileInterpolation::Nearest), Some(2.0));
        assert_eq!(q(0.75, QuantileInterpolation::Nearest), Some(5.0));
    }

    #[test]
    fn test_quantile_edge_cases() {
        let empty = Series::new("x".into(), &[Option::<f64>::None, None]);
        assert_eq!(series_quantile(&empty, 0.5, QuantileInterpolation::Linear).unwrap(), None);

        let single = Series::new("x".into(), &[7.0f64]);
        assert_eq!(
            series_quantile(&single, 0.25, QuantileInterpolation::Linear).unwrap(),
            Some(7.0)
        );
    }

    #[test]
    fn test_string_mode() {
        let series = Series::new("test".into(), &["a", "b", "a", "c", "a"]);
        assert_eq!(string_mode(&series).unwrap(), Some("a".to_string()));
    }

    #[test]
    fn test_string_mode_tie_breaks_lexicographically() {
        let series = Series::new("test".into(), &[Some("pear"), Some("apple"), None, Some("pear"), Some("apple")]);
        assert_eq!(string_mode(&series).unwrap(), Some("apple".to_string()));
    }

    #[test]
    fn test_string_mode_all_missing() {
        let series = Series::new("test".into(), &[Option::<&str>::None, None]);
        assert_eq!(string_mode(&series).unwrap(), None);
    }

    #[test]
    fn test_ensure_columns_exist() {
        let df = df!["a" => [1, 2], "b" => [3, 4]].unwrap();
        assert!(ensure_columns_exist(&df, &["a".to_string()], "test").is_ok());

        let err = ensure_columns_exist(&df, &["c".to_string()], "test").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_COLUMN_SET");
    }
}
