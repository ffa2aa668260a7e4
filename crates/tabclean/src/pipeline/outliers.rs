//! Outlier handling module.
//!
//! Bounds come from the interquartile range of each numeric column:
//! `[Q1 - factor * IQR, Q3 + factor * IQR]`. Values outside are capped to the
//! nearest bound, their rows removed, or only counted.

use crate::config::{BoundsPolicy, CleaningConfig, OutlierMethod, QuantileInterpolation};
use crate::error::{CleaningError, Result};
use crate::utils::{column_names, ensure_columns_exist, is_numeric_dtype, series_quantile};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// IQR bounds of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Compute bounds over the non-missing values; `None` if there are none.
    pub fn from_series(
        series: &Series,
        factor: f64,
        interpolation: QuantileInterpolation,
    ) -> Result<Option<Self>> {
        let (Some(q1), Some(q3)) = (
            series_quantile(series, 0.25, interpolation)?,
            series_quantile(series, 0.75, interpolation)?,
        ) else {
            return Ok(None);
        };
        let iqr = q3 - q1;

        Ok(Some(Self {
            q1,
            q3,
            lower: q1 - factor * iqr,
            upper: q3 + factor * iqr,
        }))
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// What happened to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    pub column: String,
    pub bounds: OutlierBounds,
    pub below: usize,
    pub above: usize,
    pub action: OutlierMethod,
}

impl OutlierReport {
    pub fn total(&self) -> usize {
        self.below + self.above
    }
}

/// Detects and treats outliers in numeric columns.
#[derive(Debug, Clone)]
pub struct OutlierResolver {
    factor: f64,
    method: OutlierMethod,
    interpolation: QuantileInterpolation,
    policy: BoundsPolicy,
}

impl Default for OutlierResolver {
    fn default() -> Self {
        Self::from_config(&CleaningConfig::default())
    }
}

impl OutlierResolver {
    pub fn new(factor: f64, method: OutlierMethod) -> Result<Self> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(CleaningError::InvalidConfig(format!(
                "IQR factor must be a non-negative number, got {factor}"
            )));
        }

        Ok(Self {
            factor,
            method,
            interpolation: QuantileInterpolation::default(),
            policy: BoundsPolicy::default(),
        })
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self {
            factor: config.iqr_factor,
            method: config.outlier_method,
            interpolation: config.quantile_interpolation,
            policy: config.bounds_policy,
        }
    }

    pub fn with_interpolation(mut self, interpolation: QuantileInterpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn with_bounds_policy(mut self, policy: BoundsPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Handle outliers in `columns`, or in every numeric column when `None`.
    ///
    /// Missing values are ignored when computing quartiles and are never
    /// outliers; rows with a missing value survive removal. Columns with no
    /// values are skipped.
    ///
    /// With [`OutlierMethod::Remove`] and [`BoundsPolicy::Sequential`], each
    /// column's bounds are computed on the table left by the previous
    /// column's removals. [`BoundsPolicy::Snapshot`] computes every bound
    /// first and removes all flagged rows at once.
    ///
    /// # Errors
    ///
    /// [`CleaningError::InvalidColumnSet`] if an explicit column is absent or
    /// not numeric.
    pub fn handle(
        &self,
        df: DataFrame,
        columns: Option<&[String]>,
    ) -> Result<(DataFrame, Vec<OutlierReport>)> {
        let columns = self.select_columns(&df, columns)?;

        match (self.method, self.policy) {
            (OutlierMethod::Remove, BoundsPolicy::Snapshot) => self.remove_snapshot(df, &columns),
            _ => self.handle_sequential(df, &columns),
        }
    }

    fn select_columns(&self, df: &DataFrame, columns: Option<&[String]>) -> Result<Vec<String>> {
        match columns {
            Some(columns) => {
                ensure_columns_exist(df, columns, "Outlier handling")?;
                for name in columns {
                    let dtype = df.column(name)?.dtype();
                    if !is_numeric_dtype(dtype) {
                        return Err(CleaningError::InvalidColumnSet(format!(
                            "Outlier handling requires numeric columns, '{name}' is {dtype}"
                        )));
                    }
                }
                Ok(columns.to_vec())
            }
            None => Ok(column_names(df)
                .into_iter()
                .filter(|name| {
                    df.column(name)
                        .map(|col| is_numeric_dtype(col.dtype()))
                        .unwrap_or(false)
                })
                .collect()),
        }
    }

    fn handle_sequential(
        &self,
        mut df: DataFrame,
        columns: &[String],
    ) -> Result<(DataFrame, Vec<OutlierReport>)> {
        let mut reports = Vec::with_capacity(columns.len());

        for name in columns {
            let series = df.column(name)?.as_materialized_series().clone();
            let Some(bounds) = self.bounds_of(&series)? else {
                continue;
            };

            let float_series = series.cast(&DataType::Float64)?;
            let f64_series = float_series.f64()?;
            let (below, above) = count_outside(f64_series, &bounds);

            if below + above > 0 {
                match self.method {
                    OutlierMethod::Cap => {
                        let capped = f64_series
                            .apply(|v| v.map(|val| val.clamp(bounds.lower, bounds.upper)));
                        df.replace(name, capped.into_series())?;
                        debug!("Capped {} outliers in '{}'", below + above, name);
                    }
                    OutlierMethod::Remove => {
                        let mask_values = inside_mask(f64_series, &bounds);
                        let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
                        df = df.filter(&mask)?;
                        debug!("Removed {} outlier rows for '{}'", below + above, name);
                    }
                    OutlierMethod::None => {}
                }
            }

            reports.push(self.report(name, bounds, below, above));
        }

        Ok((df, reports))
    }

    fn remove_snapshot(
        &self,
        df: DataFrame,
        columns: &[String],
    ) -> Result<(DataFrame, Vec<OutlierReport>)> {
        let mut reports = Vec::with_capacity(columns.len());
        let mut mask_values = vec![true; df.height()];

        for name in columns {
            let series = df.column(name)?.as_materialized_series();
            let Some(bounds) = self.bounds_of(series)? else {
                continue;
            };

            let float_series = series.cast(&DataType::Float64)?;
            let f64_series = float_series.f64()?;
            let (below, above) = count_outside(f64_series, &bounds);

            for (keep, inside) in mask_values.iter_mut().zip(inside_mask(f64_series, &bounds)) {
                *keep &= inside;
            }

            reports.push(self.report(name, bounds, below, above));
        }

        let removed = mask_values.iter().filter(|keep| !**keep).count();
        if removed == 0 {
            return Ok((df, reports));
        }

        let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
        let df = df.filter(&mask)?;
        debug!("Removed {} outlier rows", removed);

        Ok((df, reports))
    }

    fn bounds_of(&self, series: &Series) -> Result<Option<OutlierBounds>> {
        let bounds = OutlierBounds::from_series(series, self.factor, self.interpolation)?;
        if bounds.is_none() {
            warn!("Column '{}' has no values; skipping outlier handling", series.name());
        }
        Ok(bounds)
    }

    fn report(&self, name: &str, bounds: OutlierBounds, below: usize, above: usize) -> OutlierReport {
        if below + above > 0 {
            info!(
                "'{}': {} outliers outside [{:.4}, {:.4}] ({})",
                name,
                below + above,
                bounds.lower,
                bounds.upper,
                self.method
            );
        }

        OutlierReport {
            column: name.to_string(),
            bounds,
            below,
            above,
            action: self.method,
        }
    }
}

fn count_outside(values: &Float64Chunked, bounds: &OutlierBounds) -> (usize, usize) {
    values
        .into_iter()
        .flatten()
        .fold((0, 0), |(below, above), val| {
            if val < bounds.lower {
                (below + 1, above)
            } else if val > bounds.upper {
                (below, above + 1)
            } else {
                (below, above)
            }
        })
}

/// `true` for rows to keep; missing values are kept.
fn inside_mask(values: &Float64Chunked, bounds: &OutlierBounds) -> Vec<bool> {
    values
        .into_iter()
        .map(|opt| opt.is_none_or(|val| bounds.contains(val)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values_of(df: &DataFrame, col: &str) -> Vec<Option<f64>> {
        df.column(col)
            .unwrap()
            .as_materialized_series()
            .cast(&DataType::Float64)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    fn sample() -> DataFrame {
        df!["x" => [1i64, 2, 3, 4, 5, 100]].unwrap()
    }

    #[test]
    fn test_bounds_linear() {
        let series = sample().column("x").unwrap().as_materialized_series().clone();
        let bounds = OutlierBounds::from_series(&series, 1.5, QuantileInterpolation::Linear)
            .unwrap()
            .unwrap();

        assert_eq!(bounds.q1, 2.25);
        assert_eq!(bounds.q3, 4.75);
        assert_eq!(bounds.lower, -1.5);
        assert_eq!(bounds.upper, 8.5);
    }

    #[test]
    fn test_cap_with_lower_interpolation() {
        let resolver = OutlierResolver::new(1.5, OutlierMethod::Cap)
            .unwrap()
            .with_interpolation(QuantileInterpolation::Lower);

        let (df, reports) = resolver.handle(sample(), None).unwrap();

        let report = &reports[0];
        assert_eq!(report.bounds.q1, 2.0);
        assert_eq!(report.bounds.q3, 4.0);
        assert_eq!((report.bounds.lower, report.bounds.upper), (-1.0, 7.0));
        assert_eq!(report.above, 1);
        assert_eq!(values_of(&df, "x")[5], Some(7.0));
    }

    #[test]
    fn test_cap_keeps_values_within_bounds() {
        let (df, reports) = OutlierResolver::default().handle(sample(), None).unwrap();

        let bounds = reports[0].bounds;
        assert_eq!(values_of(&df, "x")[5], Some(8.5));
        for val in values_of(&df, "x").into_iter().flatten() {
            assert!(val >= bounds.lower && val <= bounds.upper);
        }
        assert_eq!(df.height(), 6);
    }

    #[test]
    fn test_remove_drops_rows_and_keeps_missing() {
        let df = df![
            "x" => [Some(1.0), Some(2.0), None, Some(3.0), Some(4.0), Some(5.0), Some(100.0)],
            "label" => ["a", "b", "c", "d", "e", "f", "g"],
        ]
        .unwrap();

        let resolver = OutlierResolver::new(1.5, OutlierMethod::Remove).unwrap();
        let (df, reports) = resolver.handle(df, None).unwrap();

        assert_eq!(reports[0].total(), 1);
        assert_eq!(df.height(), 6);
        assert_eq!(df.column("x").unwrap().null_count(), 1);
    }

    #[test]
    fn test_none_only_counts() {
        let resolver = OutlierResolver::new(1.5, OutlierMethod::None).unwrap();
        let (df, reports) = resolver.handle(sample(), None).unwrap();

        assert_eq!(reports[0].above, 1);
        assert!(df.equals(&sample()));
    }

    #[test]
    fn test_sequential_and_snapshot_remove_same_rows() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 1000.0],
            "b" => [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 11.0, 10.0],
        ]
        .unwrap();

        let sequential = OutlierResolver::new(1.5, OutlierMethod::Remove).unwrap();
        let (seq_df, seq_reports) = sequential.handle(df.clone(), None).unwrap();

        let snapshot = sequential.clone().with_bounds_policy(BoundsPolicy::Snapshot);
        let (snap_df, snap_reports) = snapshot.handle(df, None).unwrap();

        // Both flag the 1000 in `a` and the 11 in `b`
        assert_eq!(seq_reports[0].above, 1);
        assert_eq!(snap_reports[0].above, 1);
        assert_eq!(seq_df.height(), 6);
        assert_eq!(snap_df.height(), 6);

        // `b` is measured on 7 rows sequentially and on all 8 in a snapshot
        assert_eq!(seq_reports[1].bounds, snap_reports[1].bounds);
        assert_eq!(seq_reports[1].above, 1);
    }

    #[test]
    fn test_snapshot_bounds_ignore_earlier_removals() {
        let df = df![
            "a" => [1.0, 2.0, 3.0, 100.0],
            "b" => [1.0, 1.0, 50.0, 100.0],
        ]
        .unwrap();

        let sequential = OutlierResolver::new(1.5, OutlierMethod::Remove).unwrap();
        let (_, seq_reports) = sequential.handle(df.clone(), None).unwrap();
        let (_, snap_reports) = sequential
            .with_bounds_policy(BoundsPolicy::Snapshot)
            .handle(df, None)
            .unwrap();

        // Sequential: `b` is measured on [1, 1, 50]; snapshot on all four rows
        assert_ne!(seq_reports[1].bounds, snap_reports[1].bounds);
        assert_eq!(snap_reports[1].bounds.q1, 1.0);
    }

    #[test]
    fn test_explicit_columns_validated() {
        let df = df!["x" => [1.0, 2.0], "s" => ["a", "b"]].unwrap();
        let resolver = OutlierResolver::default();

        let err = resolver
            .handle(df.clone(), Some(&["missing".to_string()]))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_COLUMN_SET");

        let err = resolver.handle(df, Some(&["s".to_string()])).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_COLUMN_SET");
    }

    #[test]
    fn test_skips_empty_and_non_numeric_columns() {
        let df = df![
            "empty" => [Option::<f64>::None, None],
            "s" => ["a", "b"],
        ]
        .unwrap();
        let (_, reports) = OutlierResolver::default().handle(df, None).unwrap();
        assert!(reports.is_empty());
    }

    #[test]
    fn test_no_outliers_keeps_integer_type() {
        let df = df!["n" => [1i64, 2, 3, 4]].unwrap();
        let (df, reports) = OutlierResolver::default().handle(df, None).unwrap();
        assert_eq!(reports[0].total(), 0);
        assert_eq!(df.column("n").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_invalid_factor() {
        assert!(OutlierResolver::new(-1.0, OutlierMethod::Cap).is_err());
        assert!(OutlierResolver::new(f64::NAN, OutlierMethod::Cap).is_err());
    }
}
