//! Result and summary types returned by the pipeline.
//!
//! [`CleaningSummary`] records what every stage changed and serializes to
//! the JSON printed by `--json`.

use crate::cleaner::{DatetimeConversion, TypeConversion};
use crate::imputers::Imputation;
use crate::pipeline::outliers::OutlierReport;
use crate::profiler::{MissingnessReport, TableOverview};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Output of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The cleaned table.
    pub data: DataFrame,
    pub summary: CleaningSummary,
    /// Where the table was written, if an output path was given.
    pub output_path: Option<PathBuf>,
}

/// A column label changed by normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub from: String,
    pub to: String,
}

// ============================================================================
// Cleaning Summary
// ============================================================================

/// What the pipeline did, stage by stage.
///
/// Serializable so the CLI can print it as JSON.
///
/// # Example
///
/// ```rust,ignore
/// let summary = result.summary;
/// println!("Removed {} duplicates in {}ms", summary.duplicates_removed, summary.duration_ms);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,

    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_before: usize,
    pub columns_after: usize,

    pub renamed_columns: Vec<ColumnRename>,

    /// Missing values right after loading.
    pub missing_initial: MissingnessReport,
    /// Columns dropped because every value was missing.
    pub dropped_empty_columns: Vec<String>,
    /// Missing values once the empty columns are gone.
    pub missing_after_pruning: MissingnessReport,
    /// Columns dropped for exceeding the missing ratio.
    pub dropped_sparse_columns: Vec<String>,
    pub imputations: Vec<Imputation>,

    pub duplicates_removed: usize,

    pub datetime_conversions: Vec<DatetimeConversion>,
    pub type_conversions: Vec<TypeConversion>,

    pub outliers: Vec<OutlierReport>,
    /// Rows dropped by outlier removal.
    pub outlier_rows_removed: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview_before: Option<TableOverview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview_after: Option<TableOverview>,

    /// Audit trail in execution order.
    pub actions: Vec<CleaningAction>,
}

impl CleaningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }

    pub fn columns_removed(&self) -> usize {
        self.columns_before.saturating_sub(self.columns_after)
    }

    /// Total number of values filled by imputation.
    pub fn values_imputed(&self) -> usize {
        self.imputations.iter().map(|imp| imp.filled).sum()
    }

    /// Total number of outliers found across columns.
    pub fn outliers_found(&self) -> usize {
        self.outliers.iter().map(OutlierReport::total).sum()
    }
}

impl fmt::Display for CleaningSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Rows: {} -> {} ({} removed)",
            self.rows_before,
            self.rows_after,
            self.rows_removed()
        )?;
        writeln!(
            f,
            "Columns: {} -> {} ({} removed)",
            self.columns_before,
            self.columns_after,
            self.columns_removed()
        )?;

        if self.actions.is_empty() {
            writeln!(f, "No changes were needed.")?;
        } else {
            writeln!(f, "Actions:")?;
            for action in &self.actions {
                writeln!(f, "  [{}] {}", action.action_type.display_name(), action.description)?;
            }
        }

        write!(f, "Completed in {}ms", self.duration_ms)
    }
}

/// A single change made to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name or "dataset".
    pub target: String,
    pub description: String,
}

impl CleaningAction {
    pub fn new(action_type: ActionType, target: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
        }
    }
}

/// Kinds of change recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    ColumnRenamed,
    ColumnRemoved,
    ValueImputed,
    DuplicatesRemoved,
    TypeConverted,
    OutliersCapped,
    OutliersRemoved,
    OutliersReported,
}

impl ActionType {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRenamed => "Column Renamed",
            Self::ColumnRemoved => "Column Removed",
            Self::ValueImputed => "Value Imputed",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::TypeConverted => "Type Converted",
            Self::OutliersCapped => "Outliers Capped",
            Self::OutliersRemoved => "Outliers Removed",
            Self::OutliersReported => "Outliers Reported",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
