//! Missing-value resolution.
//!
//! Sparse columns are dropped; the rest are filled with a per-column
//! statistic (mean, median, zero, mode) or a constant.

mod statistical;

pub use statistical::{Imputation, MissingResolution, MissingValueResolver};
