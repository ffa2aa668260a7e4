//! Narrowing columns to their best-fit type.
//!
//! Text columns whose values all parse as integers, floats or booleans are
//! converted; float columns holding only whole numbers become integers.
//! Anything else is left alone. Missing values never take part in inference.

use crate::error::Result;
use crate::utils::ensure_columns_exist;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One column whose type changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConversion {
    pub column: String,
    pub from: String,
    pub to: String,
}

/// Result of parsing one column as datetimes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatetimeConversion {
    pub column: String,
    pub parsed: usize,
    /// Present values that could not be parsed and became missing
    pub coerced: usize,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DAY_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
];

const MONTH_FIRST_DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m-%d-%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y"];

const DAY_FIRST_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const MONTH_FIRST_DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y"];

/// Infers and applies the narrowest type for each column.
pub struct TypeNormalizer;

impl TypeNormalizer {
    /// Convert every column to its best-fit type.
    ///
    /// Never fails on content: a column that does not fit a narrower type is
    /// kept as it is.
    pub fn normalize(mut df: DataFrame) -> Result<(DataFrame, Vec<TypeConversion>)> {
        let mut conversions = Vec::new();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        for name in names {
            let series = df.column(&name)?.as_materialized_series().clone();
            if series.null_count() == series.len() {
                continue;
            }

            let converted = match series.dtype() {
                DataType::String => infer_from_strings(&series)?,
                DataType::Float32 | DataType::Float64 => narrow_float(&series)?,
                _ => None,
            };

            if let Some(converted) = converted {
                let conversion = TypeConversion {
                    column: name.clone(),
                    from: series.dtype().to_string(),
                    to: converted.dtype().to_string(),
                };
                debug!(
                    "Converted '{}' from {} to {}",
                    conversion.column, conversion.from, conversion.to
                );
                df.replace(&name, converted)?;
                conversions.push(conversion);
            }
        }

        Ok((df, conversions))
    }
}

/// Try integer, then float, then boolean over the non-missing values.
fn infer_from_strings(series: &Series) -> Result<Option<Series>> {
    let ca = series.str()?;
    let name = series.name().clone();

    let ints: Option<Vec<Option<i64>>> = ca
        .into_iter()
        .map(|opt| match opt {
            Some(val) => val.trim().parse::<i64>().ok().map(Some),
            None => Some(None),
        })
        .collect();
    if let Some(ints) = ints {
        return Ok(Some(Series::new(name, ints)));
    }

    let floats: Option<Vec<Option<f64>>> = ca
        .into_iter()
        .map(|opt| match opt {
            Some(val) => parse_float(val.trim()).map(Some),
            None => Some(None),
        })
        .collect();
    if let Some(floats) = floats {
        return Ok(Some(Series::new(name, floats)));
    }

    let bools: Option<Vec<Option<bool>>> = ca
        .into_iter()
        .map(|opt| match opt {
            Some(val) => parse_bool(val.trim()).map(Some),
            None => Some(None),
        })
        .collect();
    if let Some(bools) = bools {
        return Ok(Some(Series::new(name, bools)));
    }

    Ok(None)
}

/// Float columns whose values are all whole numbers become `Int64`.
fn narrow_float(series: &Series) -> Result<Option<Series>> {
    let float_series = series.cast(&DataType::Float64)?;
    let ca = float_series.f64()?;

    let all_integral = ca.into_iter().flatten().all(|v| {
        v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64
    });

    if !all_integral {
        return Ok(None);
    }

    let ints: Vec<Option<i64>> = ca.into_iter().map(|opt| opt.map(|v| v as i64)).collect();
    Ok(Some(Series::new(series.name().clone(), ints)))
}

/// Parse a float, rejecting the textual infinities and NaN Rust accepts.
fn parse_float(val: &str) -> Option<f64> {
    let parsed = val.parse::<f64>().ok()?;
    if parsed.is_finite() { Some(parsed) } else { None }
}

fn parse_bool(val: &str) -> Option<bool> {
    if val.eq_ignore_ascii_case("true") {
        Some(true)
    } else if val.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

/// Parse the listed columns as datetimes (millisecond precision).
///
/// Values that match no known format become missing. Columns that already
/// hold datetimes are left as they are. With `day_first`, ambiguous dates
/// such as `03/04/2024` read as 3 April.
///
/// # Errors
///
/// [`CleaningError::InvalidColumnSet`](crate::CleaningError::InvalidColumnSet)
/// if a listed column is not in the table.
pub fn convert_to_datetime(
    mut df: DataFrame,
    columns: &[String],
    day_first: bool,
) -> Result<(DataFrame, Vec<DatetimeConversion>)> {
    ensure_columns_exist(&df, columns, "Datetime conversion")?;

    let mut conversions = Vec::with_capacity(columns.len());

    for name in columns {
        let series = df.column(name)?.as_materialized_series().clone();
        if matches!(series.dtype(), DataType::Datetime(_, _) | DataType::Date) {
            debug!("Column '{}' already holds datetimes", name);
            continue;
        }

        let str_series = series.cast(&DataType::String)?;
        let mut parsed = 0;
        let mut coerced = 0;
        let timestamps: Vec<Option<i64>> = str_series
            .str()?
            .into_iter()
            .map(|opt| {
                let value = opt?;
                let millis = parse_datetime(value.trim(), day_first)
                    .map(|dt| dt.and_utc().timestamp_millis());
                match millis {
                    Some(_) => parsed += 1,
                    None => coerced += 1,
                }
                millis
            })
            .collect();

        if coerced > 0 {
            warn!(
                "{} values in '{}' could not be parsed as datetimes and were set to missing",
                coerced, name
            );
        }

        let timestamp_series = Series::new(series.name().clone(), timestamps);
        let converted = timestamp_series.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
        df.replace(name, converted)?;

        conversions.push(DatetimeConversion {
            column: name.clone(),
            parsed,
            coerced,
        });
    }

    Ok((df, conversions))
}

fn parse_datetime(value: &str, day_first: bool) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }

    let (ambiguous_datetime, ambiguous_date) = if day_first {
        (
            [DAY_FIRST_DATETIME_FORMATS, MONTH_FIRST_DATETIME_FORMATS],
            [DAY_FIRST_DATE_FORMATS, MONTH_FIRST_DATE_FORMATS],
        )
    } else {
        (
            [MONTH_FIRST_DATETIME_FORMATS, DAY_FIRST_DATETIME_FORMATS],
            [MONTH_FIRST_DATE_FORMATS, DAY_FIRST_DATE_FORMATS],
        )
    };

    let datetime_formats = DATETIME_FORMATS
        .iter()
        .chain(ambiguous_datetime.iter().flat_map(|formats| formats.iter()));
    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    let date_formats = DATE_FORMATS
        .iter()
        .chain(ambiguous_date.iter().flat_map(|formats| formats.iter()));
    for fmt in date_formats {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}
