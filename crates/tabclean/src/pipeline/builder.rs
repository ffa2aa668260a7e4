//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! running the cleaning stages in order.

use crate::cleaner::{ColumnNormalizer, DuplicateResolver, TypeNormalizer, convert_to_datetime};
use crate::config::{CleaningConfig, LoadOptions, OutlierMethod};
use crate::error::{Result, ResultExt};
use crate::imputers::MissingValueResolver;
use crate::loader::{load_table, write_table};
use crate::pipeline::outliers::OutlierResolver;
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::profiler::{NullAuditor, TableOverview};
use crate::types::{ActionType, CleaningAction, CleaningSummary, ColumnRename, PipelineResult};
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The cleaning pipeline.
///
/// Stages run in a fixed order and each consumes the table produced by the
/// previous one: normalize column names, audit missing values, drop empty
/// columns, resolve missing values, remove duplicates, normalize types,
/// handle outliers. Any stage error aborts the run.
///
/// # Example
///
/// ```rust,ignore
/// use tabclean::{Pipeline, CleaningConfig, LoadOptions};
///
/// let result = Pipeline::builder()
///     .config(CleaningConfig::builder().max_missing_ratio(0.5).build()?)
///     .load_options(LoadOptions::default().with_separator(';'))
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .run("raw.csv", Some("clean.csv".as_ref()))?;
/// ```
pub struct Pipeline {
    config: CleaningConfig,
    load_options: LoadOptions,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    missing_resolver: MissingValueResolver,
    outlier_resolver: OutlierResolver,
}

static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Load `input`, clean it and, when `output` is given, write the result.
    ///
    /// Nothing is written unless every stage succeeds.
    pub fn run(&self, input: impl AsRef<Path>, output: Option<&Path>) -> Result<PipelineResult> {
        let start_time = Instant::now();

        let outcome = self.load(input.as_ref()).and_then(|df| self.clean(df)).and_then(
            |(mut df, mut summary)| {
                if let Some(path) = output {
                    self.persist(&mut df, path)?;
                }
                summary.duration_ms = start_time.elapsed().as_millis() as u64;
                Ok(PipelineResult {
                    data: df,
                    summary,
                    output_path: output.map(Path::to_path_buf),
                })
            },
        );

        self.finish(outcome)
    }

    /// Clean a table that is already in memory.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();

        let outcome = self.clean(df).map(|(df, mut summary)| {
            summary.duration_ms = start_time.elapsed().as_millis() as u64;
            PipelineResult {
                data: df,
                summary,
                output_path: None,
            }
        });

        self.finish(outcome)
    }

    fn finish(&self, outcome: Result<PipelineResult>) -> Result<PipelineResult> {
        match outcome {
            Ok(result) => {
                info!(
                    "Pipeline completed in {}ms: {} rows x {} columns",
                    result.summary.duration_ms,
                    result.data.height(),
                    result.data.width()
                );
                self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
                Ok(result)
            }
            Err(e) => {
                error!("Pipeline error: {}", e);
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn load(&self, input: &Path) -> Result<DataFrame> {
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            0.0,
            format!("Loading {}...", input.display()),
        ));

        let df = load_table(input, &self.load_options)?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Loading,
            1.0,
            format!("Loaded {} rows x {} columns", df.height(), df.width()),
        ));
        Ok(df)
    }

    fn persist(&self, df: &mut DataFrame, path: &Path) -> Result<()> {
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Persisting,
            0.0,
            format!("Writing {}...", path.display()),
        ));

        write_table(df, path)?;

        self.report_progress(ProgressUpdate::new(
            CleaningStage::Persisting,
            1.0,
            "Output written",
        ));
        Ok(())
    }

    fn clean(&self, df: DataFrame) -> Result<(DataFrame, CleaningSummary)> {
        info!("Starting cleaning pipeline...");

        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();

        // Step 1: Column names
        self.report_progress(ProgressUpdate::new(
            CleaningStage::NormalizingColumns,
            0.0,
            "Normalizing column names...",
        ));
        info!("Step 1: Normalizing column names...");

        let (df, renames) = ColumnNormalizer::normalize(df).context("Column normalization")?;
        for (from, to) in renames {
            summary.add_action(CleaningAction::new(
                ActionType::ColumnRenamed,
                to.clone(),
                format!("Renamed '{}' to '{}'", from, to),
            ));
            summary.renamed_columns.push(ColumnRename { from, to });
        }
        summary.overview_before = Some(TableOverview::from_frame(&df)?);

        // Step 2: Missing-value audit and empty columns
        self.report_progress(ProgressUpdate::new(
            CleaningStage::AuditingMissing,
            0.0,
            "Auditing missing values...",
        ));
        info!("Step 2: Auditing missing values...");

        summary.missing_initial = NullAuditor::report_missing(&df);
        debug!("Initial missing values:\n{}", summary.missing_initial);

        let (df, dropped) =
            NullAuditor::drop_fully_missing_columns(df).context("Dropping empty columns")?;
        for name in &dropped {
            summary.add_action(CleaningAction::new(
                ActionType::ColumnRemoved,
                name,
                format!("Dropped '{}': every value is missing", name),
            ));
        }
        summary.dropped_empty_columns = dropped;
        summary.missing_after_pruning = NullAuditor::report_missing(&df);

        // Step 3: Missing values
        self.report_progress(ProgressUpdate::new(
            CleaningStage::ResolvingMissing,
            0.0,
            "Resolving missing values...",
        ));
        info!("Step 3: Resolving missing values...");

        let (df, resolution) = self
            .missing_resolver
            .resolve(df)
            .context("Missing-value resolution")?;
        for name in &resolution.dropped_columns {
            summary.add_action(CleaningAction::new(
                ActionType::ColumnRemoved,
                name,
                format!(
                    "Dropped '{}': more than {:.1}% missing",
                    name,
                    self.config.max_missing_ratio * 100.0
                ),
            ));
        }
        for imputation in &resolution.imputations {
            summary.add_action(CleaningAction::new(
                ActionType::ValueImputed,
                &imputation.column,
                format!(
                    "Filled {} missing values in '{}' with {} ({})",
                    imputation.filled, imputation.column, imputation.fill_value, imputation.strategy
                ),
            ));
        }
        summary.dropped_sparse_columns = resolution.dropped_columns;
        summary.imputations = resolution.imputations;

        // Step 4: Duplicates
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Deduplicating,
            0.0,
            "Removing duplicate rows...",
        ));
        info!("Step 4: Removing duplicate rows...");

        let (df, removed) = DuplicateResolver::remove_duplicates(
            df,
            self.config.duplicate_subset.as_deref(),
            self.config.keep,
        )
        .context("Duplicate removal")?;
        if removed > 0 {
            summary.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate rows (keep = {})", removed, self.config.keep),
            ));
        }
        summary.duplicates_removed = removed;

        // Step 5: Types
        self.report_progress(ProgressUpdate::new(
            CleaningStage::NormalizingTypes,
            0.0,
            "Normalizing column types...",
        ));
        info!("Step 5: Normalizing column types...");

        let df = if self.config.datetime_columns.is_empty() {
            df
        } else {
            let (df, conversions) =
                convert_to_datetime(df, &self.config.datetime_columns, self.config.day_first)
                    .context("Datetime conversion")?;
            for conversion in &conversions {
                summary.add_action(CleaningAction::new(
                    ActionType::TypeConverted,
                    &conversion.column,
                    format!(
                        "Parsed '{}' as datetime ({} unparseable values set to missing)",
                        conversion.column, conversion.coerced
                    ),
                ));
            }
            summary.datetime_conversions = conversions;
            df
        };

        let (df, conversions) = TypeNormalizer::normalize(df).context("Type normalization")?;
        for conversion in &conversions {
            summary.add_action(CleaningAction::new(
                ActionType::TypeConverted,
                &conversion.column,
                format!(
                    "Converted '{}' from {} to {}",
                    conversion.column, conversion.from, conversion.to
                ),
            ));
        }
        summary.type_conversions = conversions;

        // Step 6: Outliers
        self.report_progress(ProgressUpdate::new(
            CleaningStage::HandlingOutliers,
            0.0,
            "Handling outliers...",
        ));
        info!("Step 6: Handling outliers ({})...", self.config.outlier_method);

        let rows_before_outliers = df.height();
        let (df, reports) = self
            .outlier_resolver
            .handle(df, self.config.outlier_columns.as_deref())
            .context("Outlier handling")?;
        let action_type = match self.config.outlier_method {
            OutlierMethod::Cap => ActionType::OutliersCapped,
            OutlierMethod::Remove => ActionType::OutliersRemoved,
            OutlierMethod::None => ActionType::OutliersReported,
        };
        for report in reports.iter().filter(|r| r.total() > 0) {
            summary.add_action(CleaningAction::new(
                action_type,
                &report.column,
                format!(
                    "{} outliers in '{}' outside [{:.4}, {:.4}] ({})",
                    report.total(),
                    report.column,
                    report.bounds.lower,
                    report.bounds.upper,
                    report.action
                ),
            ));
        }
        summary.outliers = reports;
        summary.outlier_rows_removed = rows_before_outliers.saturating_sub(df.height());

        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.overview_after = Some(TableOverview::from_frame(&df)?);

        Ok((df, summary))
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<CleaningConfig>,
    load_options: Option<LoadOptions>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the cleaning configuration.
    pub fn config(mut self, config: CleaningConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set how the input file is read.
    pub fn load_options(mut self, options: LoadOptions) -> Self {
        self.load_options = Some(options);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// Shorthand for [`progress_reporter`](Self::progress_reporter) with a
    /// [`ClosureProgressReporter`].
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration or load options are invalid.
    pub fn build(self) -> Result<Pipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let load_options = self.load_options.unwrap_or_default();
        load_options.separator_byte()?;
        load_options.decimal_comma()?;

        Ok(Pipeline {
            missing_resolver: MissingValueResolver::from_config(&config),
            outlier_resolver: OutlierResolver::from_config(&config),
            config,
            load_options,
            progress_reporter: self.progress_reporter,
        })
    }
}
