//! Missing-value auditing.

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Missing-value statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingColumn {
    pub name: String,
    pub missing_count: usize,
    /// Share of rows that are missing, 0.0 - 100.0
    pub missing_percentage: f64,
}

/// Columns with at least one missing value, highest percentage first.
///
/// Derived from the table on demand; it is not updated when the table changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingnessReport {
    pub rows: usize,
    pub columns: Vec<MissingColumn>,
}

impl MissingnessReport {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&MissingColumn> {
        self.columns.iter().find(|col| col.name == name)
    }

    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|col| col.missing_count).sum()
    }
}

impl fmt::Display for MissingnessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return writeln!(f, "No missing values.");
        }

        writeln!(f, "{:<30} {:>10} {:>10}", "Column", "Missing", "Missing %")?;
        writeln!(f, "{}", "-".repeat(52))?;
        for col in &self.columns {
            writeln!(
                f,
                "{:<30} {:>10} {:>9.2}%",
                col.name, col.missing_count, col.missing_percentage
            )?;
        }
        Ok(())
    }
}

/// Reports and prunes missing values.
pub struct NullAuditor;

impl NullAuditor {
    /// Count missing values per column.
    ///
    /// Only columns with at least one missing value are listed, sorted by
    /// missing percentage descending; ties keep table order.
    pub fn report_missing(df: &DataFrame) -> MissingnessReport {
        let rows = df.height();

        let mut columns: Vec<MissingColumn> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| {
                let missing_count = col.null_count();
                MissingColumn {
                    name: col.name().to_string(),
                    missing_count,
                    missing_percentage: missing_count as f64 / rows as f64 * 100.0,
                }
            })
            .collect();

        columns.sort_by(|a, b| b.missing_percentage.total_cmp(&a.missing_percentage));

        MissingnessReport { rows, columns }
    }

    /// Remove every column in which all values are missing.
    ///
    /// A table without rows is returned unchanged. Returns the pruned frame
    /// and the removed column names in table order.
    pub fn drop_fully_missing_columns(df: DataFrame) -> Result<(DataFrame, Vec<String>)> {
        let rows = df.height();
        if rows == 0 {
            debug!("Table has no rows; skipping fully-missing column check");
            return Ok((df, Vec::new()));
        }

        let empty_cols: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() == rows)
            .map(|col| col.name().to_string())
            .collect();

        if empty_cols.is_empty() {
            return Ok((df, empty_cols));
        }

        info!("Dropping fully missing columns: {:?}", empty_cols);
        let cols_ref: Vec<PlSmallStr> = empty_cols.iter().map(|s| s.as_str().into()).collect();
        let df = df.drop_many(cols_ref);

        Ok((df, empty_cols))
    }
}
