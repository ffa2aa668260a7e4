//! Progress reporting for the cleaning pipeline.
//!
//! # Example
//!
//! ```rust,ignore
//! use tabclean::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df);
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Reading and decoding the input file
    Loading,
    /// Rewriting column labels
    NormalizingColumns,
    /// Dropping all-missing columns and reporting gaps
    AuditingMissing,
    /// Dropping sparse columns and imputing the rest
    ResolvingMissing,
    /// Removing duplicate rows
    Deduplicating,
    /// Datetime parsing and type narrowing
    NormalizingTypes,
    /// IQR outlier treatment
    HandlingOutliers,
    /// Writing the cleaned table
    Persisting,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::NormalizingColumns => "Normalizing Column Names",
            Self::AuditingMissing => "Auditing Missing Values",
            Self::ResolvingMissing => "Resolving Missing Values",
            Self::Deduplicating => "Removing Duplicates",
            Self::NormalizingTypes => "Normalizing Types",
            Self::HandlingOutliers => "Handling Outliers",
            Self::Persisting => "Writing Output",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Share of the whole run taken by this stage (0.0 - 1.0).
    ///
    /// The working stages sum to 1.0; terminal states weigh nothing.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Loading => 0.15,
            Self::NormalizingColumns => 0.05,
            Self::AuditingMissing => 0.10,
            Self::ResolvingMissing => 0.20,
            Self::Deduplicating => 0.10,
            Self::NormalizingTypes => 0.15,
            Self::HandlingOutliers => 0.15,
            Self::Persisting => 0.10,
            Self::Complete => 0.0,
            Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Loading => 0.0,
            Self::NormalizingColumns => 0.15,
            Self::AuditingMissing => 0.20,
            Self::ResolvingMissing => 0.30,
            Self::Deduplicating => 0.50,
            Self::NormalizingTypes => 0.60,
            Self::HandlingOutliers => 0.75,
            Self::Persisting => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

/// One progress notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: CleaningStage,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,
}

impl ProgressUpdate {
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Complete,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Failed,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
        }
    }
}

/// Receives progress updates from the pipeline.
///
/// Implementations must be `Send + Sync` so a pipeline can be moved to a
/// worker thread while still reporting.
pub trait ProgressReporter: Send + Sync {
    /// Called once or twice per stage; keep it cheap.
    fn report(&self, update: ProgressUpdate);
}

/// [`ProgressReporter`] backed by a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WORKING_STAGES: [CleaningStage; 8] = [
        CleaningStage::Loading,
        CleaningStage::NormalizingColumns,
        CleaningStage::AuditingMissing,
        CleaningStage::ResolvingMissing,
        CleaningStage::Deduplicating,
        CleaningStage::NormalizingTypes,
        CleaningStage::HandlingOutliers,
        CleaningStage::Persisting,
    ];

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::Deduplicating, 0.5, "Deduplicating...");
        assert_eq!(update.stage, CleaningStage::Deduplicating);
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.55).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_terminal() {
        let done = ProgressUpdate::complete("Done");
        assert_eq!(done.stage, CleaningStage::Complete);
        assert_eq!(done.progress, 1.0);

        let failed = ProgressUpdate::failed("boom");
        assert_eq!(failed.stage, CleaningStage::Failed);
        assert_eq!(failed.message, "boom");
    }

    #[test]
    fn test_stage_weights_sum() {
        let total_weight: f32 = WORKING_STAGES.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");
    }

    #[test]
    fn test_base_progress_is_cumulative() {
        let mut expected = 0.0;
        for stage in WORKING_STAGES {
            assert!(
                (stage.base_progress() - expected).abs() < 1e-6,
                "{:?} should start at {}",
                stage,
                expected
            );
            expected += stage.weight();
        }
    }

    #[test]
    fn test_stage_json_values() {
        let expectations = [
            (CleaningStage::Loading, "\"loading\""),
            (CleaningStage::NormalizingColumns, "\"normalizing_columns\""),
            (CleaningStage::ResolvingMissing, "\"resolving_missing\""),
            (CleaningStage::HandlingOutliers, "\"handling_outliers\""),
            (CleaningStage::Failed, "\"failed\""),
        ];

        for (stage, expected_json) in expectations {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, expected_json);
        }
    }

    #[test]
    fn test_progress_update_json() {
        let update = ProgressUpdate::new(CleaningStage::Loading, 1.0, "Loaded");
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"stage\":\"loading\""));

        let back: ProgressUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "Loaded");
    }

    #[test]
    fn test_closure_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let reporter_clone = reporter.clone();
        std::thread::spawn(move || {
            reporter_clone.report(ProgressUpdate::new(CleaningStage::Loading, 0.5, "Loading"));
        })
        .join()
        .unwrap();
        reporter.report(ProgressUpdate::complete("Done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}
