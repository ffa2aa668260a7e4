//! Table-reshaping cleaning stages.
//!
//! This module provides:
//! - Column label normalization
//! - Duplicate row removal
//! - Type inference and conversion, including explicit datetime parsing

mod duplicates;
mod naming;
mod type_normalizer;

pub use duplicates::DuplicateResolver;
pub use naming::{
    ColumnNormalizer, EMPTY_NAME_PLACEHOLDER, normalize_column_name, normalize_column_names,
};
pub use type_normalizer::{DatetimeConversion, TypeConversion, TypeNormalizer, convert_to_datetime};
