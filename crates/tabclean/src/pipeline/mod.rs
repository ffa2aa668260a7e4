//! Pipeline module.
//!
//! This module provides the cleaning pipeline, outlier handling and
//! progress reporting.

mod builder;
pub mod outliers;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use outliers::{OutlierBounds, OutlierReport, OutlierResolver};
pub use progress::{ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate};
