//! CLI entry point for the table cleaning pipeline.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tabclean::{
    BoundsPolicy, CategoricalImputation, CleaningConfig, CleaningSummary, KeepPolicy, LoadOptions,
    NumericImputation, OutlierMethod, Pipeline, PipelineResult, QuantileInterpolation,
};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Clean a delimited data file",
    long_about = "Normalizes column names, fills or drops missing values, removes duplicate rows, \
                  narrows column types and treats outliers.\n\n\
                  EXAMPLES:\n  \
                  # Clean and write the result\n  \
                  tabclean -i raw.csv -o clean.csv\n\n  \
                  # Semicolon-separated latin1 file with decimal commas\n  \
                  tabclean -i raw.csv --sep ';' --encoding latin1 --decimal ','\n\n  \
                  # Remove outlier rows instead of capping, print a JSON summary\n  \
                  tabclean -i raw.csv --outlier-method remove --json"
)]
struct Args {
    /// Path to the delimited file to clean
    #[arg(short, long)]
    input: PathBuf,

    /// Where to write the cleaned CSV (nothing is written when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Column delimiter of the input file
    #[arg(long, default_value_t = ',')]
    sep: char,

    /// Text encoding of the input file (e.g. utf-8, latin1, windows-1252)
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Decimal point character of the input file ('.' or ',')
    #[arg(long, default_value_t = '.')]
    decimal: char,

    /// Fill for numeric columns: mean, median or zero
    #[arg(long, default_value = "median")]
    numeric_strategy: NumericImputation,

    /// Fill for other columns: mode or constant
    #[arg(long, default_value = "mode")]
    categorical_strategy: CategoricalImputation,

    /// Value used by the constant strategy
    #[arg(long, default_value = "missing")]
    fill_value: String,

    /// Drop columns whose share of missing values exceeds this (0.0 - 1.0)
    #[arg(long, default_value_t = 0.9)]
    max_missing_ratio: f64,

    /// Which duplicate to keep: first, last or none
    #[arg(long, default_value = "first")]
    keep: KeepPolicy,

    /// Comma-separated columns that define a duplicate (default: all)
    #[arg(long, value_delimiter = ',')]
    subset: Option<Vec<String>>,

    /// Comma-separated numeric columns checked for outliers (default: all numeric)
    #[arg(long, value_delimiter = ',')]
    outlier_columns: Option<Vec<String>>,

    /// What to do with outliers: cap, remove or none
    #[arg(long, default_value = "cap")]
    outlier_method: OutlierMethod,

    /// IQR multiplier for the outlier bounds
    #[arg(long, default_value_t = 1.5)]
    iqr_factor: f64,

    /// Quantile estimator: linear, lower, higher, nearest or midpoint
    #[arg(long, default_value = "linear")]
    quantile: QuantileInterpolation,

    /// Outlier removal bounds: sequential or snapshot
    #[arg(long, default_value = "sequential")]
    bounds_policy: BoundsPolicy,

    /// Comma-separated columns to parse as dates
    #[arg(long, value_delimiter = ',')]
    datetime_columns: Vec<String>,

    /// Read ambiguous dates as day/month (false for month/day)
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    day_first: bool,

    /// Number of rows of the cleaned table to print
    #[arg(long, default_value_t = 5)]
    head: usize,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Print the summary as JSON to stdout (disables logging)
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    let mut config_builder = CleaningConfig::builder()
        .max_missing_ratio(args.max_missing_ratio)
        .numeric_imputation(args.numeric_strategy)
        .categorical_imputation(args.categorical_strategy)
        .fill_constant(&args.fill_value)
        .keep(args.keep)
        .iqr_factor(args.iqr_factor)
        .outlier_method(args.outlier_method)
        .quantile_interpolation(args.quantile)
        .bounds_policy(args.bounds_policy)
        .datetime_columns(args.datetime_columns.iter().cloned())
        .day_first(args.day_first);

    if let Some(ref subset) = args.subset {
        config_builder = config_builder.duplicate_subset(subset.iter().cloned());
    }
    if let Some(ref columns) = args.outlier_columns {
        config_builder = config_builder.outlier_columns(columns.iter().cloned());
    }

    let config = config_builder.build().context("Invalid cleaning options")?;

    let load_options = LoadOptions::default()
        .with_separator(args.sep)
        .with_encoding(&args.encoding)
        .with_decimal(args.decimal);

    let mut builder = Pipeline::builder().config(config).load_options(load_options);
    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }
    let pipeline = builder.build().context("Invalid load options")?;

    match pipeline.run(&args.input, args.output.as_deref()) {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result.summary)?);
            } else {
                print_human_readable_summary(&result, &args);
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::json!({ "error": e }));
            } else {
                error!("Cleaning failed: {}", e);
            }
            Err(e.into())
        }
    }
}

/// Print the reports of a successful run.
///
/// Uses `println!` on purpose: this is the command's output, not logging.
fn print_human_readable_summary(result: &PipelineResult, args: &Args) {
    let summary: &CleaningSummary = &result.summary;

    println!("\n{}", "=".repeat(80));
    println!("TABLE OVERVIEW (BEFORE)");
    println!("{}", "=".repeat(80));
    if let Some(overview) = &summary.overview_before {
        print!("{}", overview);
    }

    println!("\nMISSING VALUES");
    println!("{}", "-".repeat(40));
    print!("{}", summary.missing_initial);

    if !summary.dropped_empty_columns.is_empty() {
        println!("\nDropped empty columns: {}", summary.dropped_empty_columns.join(", "));
        println!("\nMISSING VALUES (AFTER DROPPING EMPTY COLUMNS)");
        println!("{}", "-".repeat(40));
        print!("{}", summary.missing_after_pruning);
    }

    if !summary.outliers.is_empty() {
        println!("\nOUTLIERS");
        println!("{}", "-".repeat(40));
        println!(
            "{:<24} {:>12} {:>12} {:>8} {:>8}",
            "Column", "Lower", "Upper", "Below", "Above"
        );
        for report in &summary.outliers {
            println!(
                "{:<24} {:>12.4} {:>12.4} {:>8} {:>8}",
                report.column, report.bounds.lower, report.bounds.upper, report.below, report.above
            );
        }
    }

    println!("\n{}", "=".repeat(80));
    println!("TABLE OVERVIEW (AFTER)");
    println!("{}", "=".repeat(80));
    if let Some(overview) = &summary.overview_after {
        print!("{}", overview);
    }

    if args.head > 0 {
        println!("\nFIRST ROWS");
        println!("{}", result.data.head(Some(args.head)));
    }

    println!("\n{}", "=".repeat(80));
    println!("SUMMARY");
    println!("{}", "=".repeat(80));
    println!("{}", summary);

    match &result.output_path {
        Some(path) => println!("Cleaned data written to: {}", path.display()),
        None => println!("No output path given; nothing was written."),
    }
}
