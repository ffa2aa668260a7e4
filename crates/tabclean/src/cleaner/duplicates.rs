//! Duplicate row removal.

use crate::config::KeepPolicy;
use crate::error::Result;
use crate::utils::{column_names, ensure_columns_exist};
use polars::prelude::*;
use tracing::debug;

/// Removes rows that repeat the values of earlier (or later) rows.
pub struct DuplicateResolver;

impl DuplicateResolver {
    /// Remove duplicate rows, comparing on `subset` or on every column.
    ///
    /// Missing values compare equal to each other. Surviving rows keep their
    /// relative order. With [`KeepPolicy::None`] every member of a duplicate
    /// group is removed. Returns the frame and the number of rows removed.
    ///
    /// # Errors
    ///
    /// [`CleaningError::InvalidColumnSet`](crate::CleaningError::InvalidColumnSet)
    /// if `subset` names a column that is not in the table.
    pub fn remove_duplicates(
        df: DataFrame,
        subset: Option<&[String]>,
        keep: KeepPolicy,
    ) -> Result<(DataFrame, usize)> {
        let key_columns = match subset {
            Some(columns) => {
                ensure_columns_exist(&df, columns, "Duplicate subset")?;
                columns.to_vec()
            }
            None => column_names(&df),
        };

        let rows = df.height();
        if rows == 0 || key_columns.is_empty() {
            return Ok((df, 0));
        }

        let strategy = match keep {
            KeepPolicy::First => UniqueKeepStrategy::First,
            KeepPolicy::Last => UniqueKeepStrategy::Last,
            KeepPolicy::None => UniqueKeepStrategy::None,
        };
        let deduped = df.unique_stable(Some(&key_columns), strategy, None)?;

        let removed = rows - deduped.height();
        if removed == 0 {
            return Ok((df, 0));
        }

        debug!(
            "Removed {} duplicate rows (keep = {}, key columns = {:?})",
            removed, keep, key_columns
        );

        Ok((deduped, removed))
    }
}
