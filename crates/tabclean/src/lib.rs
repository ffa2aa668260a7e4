//! Tabular Data Cleaning Library
//!
//! Loads a delimited file into a Polars [`DataFrame`](polars::prelude::DataFrame)
//! and runs it through a fixed sequence of cleaning stages.
//!
//! # Overview
//!
//! - **Loading**: any delimiter, any WHATWG encoding label, `.` or `,` decimals
//! - **Column names**: trimmed, lowercased, ASCII-folded, `_`-separated
//! - **Missing values**: audit, drop empty and sparse columns, impute the rest
//! - **Duplicates**: full-row or subset comparison, keep first/last/none
//! - **Types**: narrowing of text and float columns, optional datetime parsing
//! - **Outliers**: IQR bounds per numeric column, cap/remove/report
//! - **Progress Reporting**: per-stage updates through a callback
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tabclean::{CleaningConfig, KeepPolicy, Pipeline};
//!
//! let config = CleaningConfig::builder()
//!     .max_missing_ratio(0.5)
//!     .keep(KeepPolicy::Last)
//!     .build()?;
//!
//! let result = Pipeline::builder()
//!     .config(config)
//!     .build()?
//!     .run("raw.csv", Some("clean.csv".as_ref()))?;
//!
//! println!("{}", result.summary);
//! ```
//!
//! Each stage is also usable on its own:
//!
//! ```rust,ignore
//! use tabclean::{ColumnNormalizer, DuplicateResolver, KeepPolicy};
//!
//! let (df, _renames) = ColumnNormalizer::normalize(df)?;
//! let (df, removed) = DuplicateResolver::remove_duplicates(df, None, KeepPolicy::First)?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{
    ColumnNormalizer, DatetimeConversion, DuplicateResolver, TypeConversion, TypeNormalizer,
    convert_to_datetime, normalize_column_name, normalize_column_names,
};
pub use config::{
    BoundsPolicy, CategoricalImputation, CleaningConfig, CleaningConfigBuilder, KeepPolicy,
    LoadOptions, NumericImputation, OutlierMethod, QuantileInterpolation,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use imputers::{Imputation, MissingResolution, MissingValueResolver};
pub use loader::{load_table, write_table};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, OutlierBounds, OutlierReport, OutlierResolver,
    Pipeline, PipelineBuilder, ProgressReporter, ProgressUpdate,
};
pub use profiler::{MissingColumn, MissingnessReport, NullAuditor, TableOverview};
pub use types::{ActionType, CleaningAction, CleaningSummary, ColumnRename, PipelineResult};
pub use utils::{DtypeCategory, dtype_category_str, get_dtype_category, is_numeric_dtype};
