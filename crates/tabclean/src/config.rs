//! Configuration types for the cleaning pipeline.
//!
//! Strategy enums parse from their lowercase names (`"median"`, `"cap"`, ...)
//! and reject anything else with [`CleaningError::InvalidStrategy`].
//! [`CleaningConfig`] is assembled through a validating builder.

use crate::error::{CleaningError, Result};
use polars::prelude::QuantileMethod;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NumericImputation {
    /// Arithmetic mean of the non-missing values
    Mean,
    /// Median of the non-missing values
    #[default]
    Median,
    /// Literal zero
    Zero,
}

impl NumericImputation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Zero => "zero",
        }
    }
}

impl FromStr for NumericImputation {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "median" => Ok(Self::Median),
            "zero" => Ok(Self::Zero),
            _ => Err(invalid("numeric strategy", s, "mean, median, zero")),
        }
    }
}

/// Strategy for imputing missing non-numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CategoricalImputation {
    /// Most frequent non-missing value, falling back to the fill constant
    #[default]
    Mode,
    /// Always the fill constant
    Constant,
}

impl CategoricalImputation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Constant => "constant",
        }
    }
}

impl FromStr for CategoricalImputation {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mode" => Ok(Self::Mode),
            "constant" => Ok(Self::Constant),
            _ => Err(invalid("categorical strategy", s, "mode, constant")),
        }
    }
}

/// Which row of a duplicate group survives deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    /// Keep the first occurrence
    #[default]
    First,
    /// Keep the last occurrence
    Last,
    /// Drop every row that belongs to a duplicate group
    None,
}

impl KeepPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Last => "last",
            Self::None => "none",
        }
    }
}

impl FromStr for KeepPolicy {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            "none" | "false" => Ok(Self::None),
            _ => Err(invalid("keep policy", s, "first, last, none")),
        }
    }
}

/// What to do with values outside the IQR bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Clamp out-of-bounds values to the nearest bound
    #[default]
    Cap,
    /// Drop rows holding an out-of-bounds value
    Remove,
    /// Count only
    None,
}

impl OutlierMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cap => "cap",
            Self::Remove => "remove",
            Self::None => "none",
        }
    }
}

impl FromStr for OutlierMethod {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cap" => Ok(Self::Cap),
            "remove" => Ok(Self::Remove),
            "none" => Ok(Self::None),
            _ => Err(invalid("outlier method", s, "cap, remove, none")),
        }
    }
}

/// Quantile estimator used for the outlier quartiles.
///
/// With `n` sorted values the quantile `q` sits at position `q * (n - 1)`;
/// the variants differ only when that position is fractional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QuantileInterpolation {
    /// Interpolate linearly between the two neighbours
    #[default]
    Linear,
    /// Take the lower neighbour
    Lower,
    /// Take the higher neighbour
    Higher,
    /// Take the nearest neighbour (ties round away from zero)
    Nearest,
    /// Average the two neighbours
    Midpoint,
}

impl QuantileInterpolation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Lower => "lower",
            Self::Higher => "higher",
            Self::Nearest => "nearest",
            Self::Midpoint => "midpoint",
        }
    }
}

impl From<QuantileInterpolation> for QuantileMethod {
    fn from(interpolation: QuantileInterpolation) -> Self {
        match interpolation {
            QuantileInterpolation::Linear => QuantileMethod::Linear,
            QuantileInterpolation::Lower => QuantileMethod::Lower,
            QuantileInterpolation::Higher => QuantileMethod::Higher,
            QuantileInterpolation::Nearest => QuantileMethod::Nearest,
            QuantileInterpolation::Midpoint => QuantileMethod::Midpoint,
        }
    }
}

impl FromStr for QuantileInterpolation {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "lower" => Ok(Self::Lower),
            "higher" => Ok(Self::Higher),
            "nearest" => Ok(Self::Nearest),
            "midpoint" => Ok(Self::Midpoint),
            _ => Err(invalid(
                "quantile interpolation",
                s,
                "linear, lower, higher, nearest, midpoint",
            )),
        }
    }
}

/// When outlier bounds are computed relative to row removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundsPolicy {
    /// Each column's bounds are computed on the table as left by the
    /// previous column (rows removed for one column shift the next).
    #[default]
    Sequential,
    /// Bounds for every column are computed up front from the input table.
    Snapshot,
}

impl BoundsPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Snapshot => "snapshot",
        }
    }
}

impl FromStr for BoundsPolicy {
    type Err = CleaningError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(invalid("bounds policy", s, "sequential, snapshot")),
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )*
    };
}

display_as_str!(
    NumericImputation,
    CategoricalImputation,
    KeepPolicy,
    OutlierMethod,
    QuantileInterpolation,
    BoundsPolicy
);

fn invalid(option: &'static str, value: &str, expected: &'static str) -> CleaningError {
    CleaningError::InvalidStrategy {
        option,
        value: value.to_string(),
        expected,
    }
}

/// Tokens read as missing when loading a delimited file.
pub const DEFAULT_NULL_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Options controlling how a delimited file is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Column delimiter. Must be a single ASCII character.
    pub separator: char,
    /// Text encoding label (anything the WHATWG Encoding Standard knows,
    /// e.g. `utf-8`, `latin1`, `windows-1252`).
    pub encoding: String,
    /// Decimal point character, `.` or `,`.
    pub decimal: char,
    /// Cell contents treated as missing.
    pub null_markers: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            separator: ',',
            encoding: "utf-8".to_string(),
            decimal: '.',
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LoadOptions {
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    pub fn with_decimal(mut self, decimal: char) -> Self {
        self.decimal = decimal;
        self
    }

    pub fn with_null_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.null_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// The separator as the single byte the CSV reader expects.
    pub fn separator_byte(&self) -> Result<u8> {
        if self.separator.is_ascii() && self.separator != '\n' && self.separator != '\r' {
            Ok(self.separator as u8)
        } else {
            Err(CleaningError::InvalidConfig(format!(
                "separator must be a single ASCII character, got {:?}",
                self.separator
            )))
        }
    }

    /// Whether numbers use a decimal comma.
    pub fn decimal_comma(&self) -> Result<bool> {
        match self.decimal {
            '.' => Ok(false),
            ',' if self.separator == ',' => Err(CleaningError::InvalidConfig(
                "decimal ',' cannot be combined with separator ','".to_string(),
            )),
            ',' => Ok(true),
            other => Err(CleaningError::InvalidConfig(format!(
                "decimal must be '.' or ',', got {other:?}"
            ))),
        }
    }
}

/// Configuration for the cleaning stages.
///
/// Use [`CleaningConfig::builder()`] for a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use tabclean::config::{CleaningConfig, OutlierMethod};
///
/// let config = CleaningConfig::builder()
///     .max_missing_ratio(0.5)
///     .outlier_method(OutlierMethod::Remove)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Columns whose missing ratio exceeds this value (0.0 - 1.0) are dropped
    /// before imputation. Default: 0.9
    pub max_missing_ratio: f64,

    /// Default: Median
    pub numeric_imputation: NumericImputation,

    /// Default: Mode
    pub categorical_imputation: CategoricalImputation,

    /// Fill value for `Constant` imputation and for `Mode` on a column
    /// without any value. Default: "missing"
    pub fill_constant: String,

    /// Columns defining row equality for deduplication (all when `None`).
    pub duplicate_subset: Option<Vec<String>>,

    /// Default: First
    pub keep: KeepPolicy,

    /// Columns checked for outliers (every numeric column when `None`).
    pub outlier_columns: Option<Vec<String>>,

    /// IQR multiplier. Default: 1.5
    pub iqr_factor: f64,

    /// Default: Cap
    pub outlier_method: OutlierMethod,

    /// Default: Linear
    pub quantile_interpolation: QuantileInterpolation,

    /// Default: Sequential
    pub bounds_policy: BoundsPolicy,

    /// String columns to parse as dates before type normalization.
    #[serde(default)]
    pub datetime_columns: Vec<String>,

    /// Read ambiguous dates as day/month rather than month/day. Default: true
    #[serde(default = "default_day_first")]
    pub day_first: bool,
}

fn default_day_first() -> bool {
    true
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            max_missing_ratio: 0.9,
            numeric_imputation: NumericImputation::default(),
            categorical_imputation: CategoricalImputation::default(),
            fill_constant: "missing".to_string(),
            duplicate_subset: None,
            keep: KeepPolicy::default(),
            outlier_columns: None,
            iqr_factor: 1.5,
            outlier_method: OutlierMethod::default(),
            quantile_interpolation: QuantileInterpolation::default(),
            bounds_policy: BoundsPolicy::default(),
            datetime_columns: Vec::new(),
            day_first: true,
        }
    }
}

impl CleaningConfig {
    pub fn builder() -> CleaningConfigBuilder {
        CleaningConfigBuilder::default()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_missing_ratio) {
            return Err(CleaningError::InvalidConfig(format!(
                "max_missing_ratio must be between 0.0 and 1.0, got {}",
                self.max_missing_ratio
            )));
        }

        if !self.iqr_factor.is_finite() || self.iqr_factor < 0.0 {
            return Err(CleaningError::InvalidConfig(format!(
                "iqr_factor must be a non-negative number, got {}",
                self.iqr_factor
            )));
        }

        if self.fill_constant.is_empty() {
            return Err(CleaningError::InvalidConfig(
                "fill_constant must not be empty".to_string(),
            ));
        }

        if matches!(&self.duplicate_subset, Some(subset) if subset.is_empty()) {
            return Err(CleaningError::InvalidColumnSet(
                "duplicate subset must name at least one column".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for [`CleaningConfig`].
#[derive(Debug, Default)]
pub struct CleaningConfigBuilder {
    max_missing_ratio: Option<f64>,
    numeric_imputation: Option<NumericImputation>,
    categorical_imputation: Option<CategoricalImputation>,
    fill_constant: Option<String>,
    duplicate_subset: Option<Vec<String>>,
    keep: Option<KeepPolicy>,
    outlier_columns: Option<Vec<String>>,
    iqr_factor: Option<f64>,
    outlier_method: Option<OutlierMethod>,
    quantile_interpolation: Option<QuantileInterpolation>,
    bounds_policy: Option<BoundsPolicy>,
    datetime_columns: Option<Vec<String>>,
    day_first: Option<bool>,
}

impl CleaningConfigBuilder {
    /// Set the missing ratio (0.0 - 1.0) above which a column is dropped.
    pub fn max_missing_ratio(mut self, ratio: f64) -> Self {
        self.max_missing_ratio = Some(ratio);
        self
    }

    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    pub fn categorical_imputation(mut self, strategy: CategoricalImputation) -> Self {
        self.categorical_imputation = Some(strategy);
        self
    }

    pub fn fill_constant(mut self, value: impl Into<String>) -> Self {
        self.fill_constant = Some(value.into());
        self
    }

    /// Restrict duplicate detection to these columns.
    pub fn duplicate_subset<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.duplicate_subset = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn keep(mut self, keep: KeepPolicy) -> Self {
        self.keep = Some(keep);
        self
    }

    /// Restrict outlier handling to these columns.
    pub fn outlier_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outlier_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn iqr_factor(mut self, factor: f64) -> Self {
        self.iqr_factor = Some(factor);
        self
    }

    pub fn outlier_method(mut self, method: OutlierMethod) -> Self {
        self.outlier_method = Some(method);
        self
    }

    pub fn quantile_interpolation(mut self, interpolation: QuantileInterpolation) -> Self {
        self.quantile_interpolation = Some(interpolation);
        self
    }

    pub fn bounds_policy(mut self, policy: BoundsPolicy) -> Self {
        self.bounds_policy = Some(policy);
        self
    }

    /// Parse these string columns as dates before type normalization.
    pub fn datetime_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.datetime_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn day_first(mut self, day_first: bool) -> Self {
        self.day_first = Some(day_first);
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<CleaningConfig> {
        let defaults = CleaningConfig::default();
        let config = CleaningConfig {
            max_missing_ratio: self.max_missing_ratio.unwrap_or(defaults.max_missing_ratio),
            numeric_imputation: self.numeric_imputation.unwrap_or_default(),
            categorical_imputation: self.categorical_imputation.unwrap_or_default(),
            fill_constant: self.fill_constant.unwrap_or(defaults.fill_constant),
            duplicate_subset: self.duplicate_subset,
            keep: self.keep.unwrap_or_default(),
            outlier_columns: self.outlier_columns,
            iqr_factor: self.iqr_factor.unwrap_or(defaults.iqr_factor),
            outlier_method: self.outlier_method.unwrap_or_default(),
            quantile_interpolation: self.quantile_interpolation.unwrap_or_default(),
            bounds_policy: self.bounds_policy.unwrap_or_default(),
            datetime_columns: self.datetime_columns.unwrap_or_default(),
            day_first: self.day_first.unwrap_or(defaults.day_first),
        };

        config.validate()?;
        Ok(config)
    }
}
