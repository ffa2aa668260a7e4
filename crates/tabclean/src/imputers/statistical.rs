//! Statistical imputation of missing values.
//!
//! Numeric columns are filled with the mean, median or zero; every other
//! column is filled with its mode or a constant. Columns that are missing
//! more often than the configured ratio are dropped first.

use crate::config::{CategoricalImputation, CleaningConfig, NumericImputation};
use crate::error::{CleaningError, Result};
use crate::utils::{is_numeric_dtype, string_mode, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One filled column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Imputation {
    pub column: String,
    /// Strategy that produced the fill value (e.g. "median", "mode", "constant")
    pub strategy: String,
    pub fill_value: String,
    pub filled: usize,
}

/// What the resolver changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MissingResolution {
    /// Columns dropped for exceeding the missing ratio, in table order
    pub dropped_columns: Vec<String>,
    pub imputations: Vec<Imputation>,
}

/// Drops sparse columns and imputes the remaining missing values.
#[derive(Debug, Clone)]
pub struct MissingValueResolver {
    numeric: NumericImputation,
    categorical: CategoricalImputation,
    max_missing_ratio: f64,
    fill_constant: String,
}

impl Default for MissingValueResolver {
    fn default() -> Self {
        Self::from_config(&CleaningConfig::default())
    }
}

impl MissingValueResolver {
    pub fn new(
        numeric: NumericImputation,
        categorical: CategoricalImputation,
        max_missing_ratio: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&max_missing_ratio) {
            return Err(CleaningError::InvalidConfig(format!(
                "max_missing_ratio must be between 0.0 and 1.0, got {max_missing_ratio}"
            )));
        }

        Ok(Self {
            numeric,
            categorical,
            max_missing_ratio,
            fill_constant: CleaningConfig::default().fill_constant,
        })
    }

    /// Build a resolver from strategy names such as `"median"` and `"mode"`.
    ///
    /// # Errors
    ///
    /// [`CleaningError::InvalidStrategy`] for an unrecognized name.
    pub fn from_names(numeric: &str, categorical: &str, max_missing_ratio: f64) -> Result<Self> {
        Self::new(numeric.parse()?, categorical.parse()?, max_missing_ratio)
    }

    pub fn from_config(config: &CleaningConfig) -> Self {
        Self {
            numeric: config.numeric_imputation,
            categorical: config.categorical_imputation,
            max_missing_ratio: config.max_missing_ratio,
            fill_constant: config.fill_constant.clone(),
        }
    }

    /// Replace the constant used for `Constant` imputation (default "missing").
    pub fn with_fill_constant(mut self, value: impl Into<String>) -> Self {
        self.fill_constant = value.into();
        self
    }

    /// Drop columns over the missing ratio, then fill every remaining gap.
    pub fn resolve(&self, df: DataFrame) -> Result<(DataFrame, MissingResolution)> {
        let mut resolution = MissingResolution::default();
        let rows = df.height();
        if rows == 0 {
            return Ok((df, resolution));
        }

        // 1. Drop columns with too many missing values
        resolution.dropped_columns = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() as f64 / rows as f64 > self.max_missing_ratio)
            .map(|col| col.name().to_string())
            .collect();

        let mut df = if resolution.dropped_columns.is_empty() {
            df
        } else {
            info!(
                "Dropping columns with > {:.1}% missing: {:?}",
                self.max_missing_ratio * 100.0,
                resolution.dropped_columns
            );
            let cols_ref: Vec<PlSmallStr> = resolution
                .dropped_columns
                .iter()
                .map(|s| s.as_str().into())
                .collect();
            df.drop_many(cols_ref)
        };

        // 2. Partition the remaining columns with gaps
        let (numeric_cols, other_cols): (Vec<(String, bool)>, Vec<(String, bool)>) = df
            .get_columns()
            .iter()
            .filter(|col| col.null_count() > 0)
            .map(|col| (col.name().to_string(), is_numeric_dtype(col.dtype())))
            .partition(|(_, numeric)| *numeric);

        // 3. Numeric imputation
        for (name, _) in &numeric_cols {
            let imputation = self.fill_numeric(&mut df, name)?;
            resolution.imputations.push(imputation);
        }

        // 4. Categorical imputation
        for (name, _) in &other_cols {
            let imputation = self.fill_categorical(&mut df, name)?;
            resolution.imputations.push(imputation);
        }

        Ok((df, resolution))
    }

    fn fill_numeric(&self, df: &mut DataFrame, name: &str) -> Result<Imputation> {
        let series = df.column(name)?.as_materialized_series().clone();
        let filled = series.null_count();
        let float_series = series.cast(&DataType::Float64)?;

        let computed = match self.numeric {
            NumericImputation::Zero => Some(0.0),
            NumericImputation::Mean => float_series.mean(),
            NumericImputation::Median => float_series.median(),
        };
        let (strategy, fill_value) = match computed {
            Some(value) => (self.numeric.as_str(), value),
            None => {
                warn!(
                    "Column '{}' has no values to compute a {}; filling with zero",
                    name, self.numeric
                );
                ("zero (fallback)", 0.0)
            }
        };

        let result = float_series
            .f64()?
            .apply(|v| Some(v.unwrap_or(fill_value)))
            .into_series();
        df.replace(name, result)?;

        debug!("Filled {} missing values in '{}' with {}: {}", filled, name, strategy, fill_value);

        Ok(Imputation {
            column: name.to_string(),
            strategy: strategy.to_string(),
            fill_value: fill_value.to_string(),
            filled,
        })
    }

    fn fill_categorical(&self, df: &mut DataFrame, name: &str) -> Result<Imputation> {
        let series = df.column(name)?.as_materialized_series().clone();
        let filled = series.null_count();

        let mode = match self.categorical {
            CategoricalImputation::Mode => string_mode(&series)?,
            CategoricalImputation::Constant => None,
        };

        let (strategy, fill_value, result) = match mode {
            Some(mode) => {
                let result = fill_with_existing_value(&series, &mode)?;
                ("mode", mode, result)
            }
            None => {
                let strategy = match self.categorical {
                    CategoricalImputation::Mode => "constant (no mode)",
                    CategoricalImputation::Constant => "constant",
                };
                let values: Vec<Option<String>> = string_values(&series)?
                    .into_iter()
                    .map(|v| Some(v.unwrap_or_else(|| self.fill_constant.clone())))
                    .collect();
                let result = Series::new(series.name().clone(), values);
                (strategy, self.fill_constant.clone(), result)
            }
        };

        df.replace(name, result)?;
        debug!("Filled {} missing values in '{}' with {}: '{}'", filled, name, strategy, fill_value);

        Ok(Imputation {
            column: name.to_string(),
            strategy: strategy.to_string(),
            fill_value,
            filled,
        })
    }
}

/// Fill the gaps of `series` with the first value whose string form is
/// `value`, keeping the column's data type.
fn fill_with_existing_value(series: &Series, value: &str) -> Result<Series> {
    let values = string_values(series)?;
    let source = values
        .iter()
        .position(|v| v.as_deref() == Some(value))
        .ok_or_else(|| {
            CleaningError::InvalidConfig(format!(
                "value '{}' not present in column '{}'",
                value,
                series.name()
            ))
        })? as IdxSize;

    let indices: Vec<IdxSize> = values
        .iter()
        .enumerate()
        .map(|(idx, v)| if v.is_some() { idx as IdxSize } else { source })
        .collect();

    Ok(series.take(&IdxCa::from_vec("idx".into(), indices))?)
}
