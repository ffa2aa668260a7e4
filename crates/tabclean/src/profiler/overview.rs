//! Basic table information: shape, column types and numeric summaries.

use crate::error::Result;
use crate::utils::{dtype_category_str, is_numeric_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptive statistics over the non-missing values of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0.0 for fewer than two values
    pub std: f64,
}

impl NumericStats {
    /// Returns `None` when the series has no values.
    pub fn from_series(series: &Series) -> Result<Option<Self>> {
        let float_series = series.cast(&DataType::Float64)?;
        let (Some(min), Some(max), Some(mean)) = (
            float_series.min::<f64>()?,
            float_series.max::<f64>()?,
            float_series.mean(),
        ) else {
            return Ok(None);
        };
        let std = float_series
            .std(1)
            .filter(|std| std.is_finite())
            .unwrap_or(0.0);

        Ok(Some(Self {
            min,
            max,
            mean,
            std,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: String,
    /// Broad kind of the column: numeric, datetime, boolean, string, null or other
    pub category: String,
    pub non_null: usize,
    pub missing: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<NumericStats>,
}

/// Snapshot of a table's shape and column types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOverview {
    pub rows: usize,
    pub columns: usize,
    pub column_overviews: Vec<ColumnOverview>,
}

impl TableOverview {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut column_overviews = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let missing = series.null_count();
            let stats = if is_numeric_dtype(series.dtype()) {
                NumericStats::from_series(series)?
            } else {
                None
            };

            column_overviews.push(ColumnOverview {
                name: series.name().to_string(),
                dtype: series.dtype().to_string(),
                category: dtype_category_str(series.dtype()).to_string(),
                non_null: series.len() - missing,
                missing,
                stats,
            });
        }

        Ok(Self {
            rows: df.height(),
            columns: df.width(),
            column_overviews,
        })
    }
}

impl fmt::Display for TableOverview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}, Columns: {}", self.rows, self.columns)?;
        writeln!(
            f,
            "{:<24} {:<10} {:>9} {:>8} {:>12} {:>12} {:>12} {:>12}",
            "Column", "Type", "Non-null", "Missing", "Min", "Mean", "Max", "Std"
        )?;
        writeln!(f, "{}", "-".repeat(106))?;

        for col in &self.column_overviews {
            write!(
                f,
                "{:<24} {:<10} {:>9} {:>8}",
                truncate_str(&col.name, 23),
                truncate_str(&col.dtype, 10),
                col.non_null,
                col.missing
            )?;
            match &col.stats {
                Some(stats) => writeln!(
                    f,
                    " {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
                    stats.min, stats.mean, stats.max, stats.std
                )?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

/// Truncate a string to `max_len` characters with an ellipsis.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
