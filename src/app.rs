//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - initializes logging
//! - loads settings (env + `.env`) and applies CLI overrides
//! - dispatches to the ingest / forecast / sample workflows
//! - prints terminal summaries

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::cli::{Cli, Command, ForecastArgs, IngestArgs, SampleArgs, StoreArgs};
use crate::data::{SampleConfig, generate_sample, write_sample_csv};
use crate::domain::Settings;
use crate::error::AppError;
use crate::fit::CancelToken;
use crate::io::ColumnMapping;
use crate::loader::RetryPolicy;

pub mod pipeline;

/// Exit status used when a second Ctrl-C aborts the process.
const INTERRUPTED_EXIT: i32 = 130;

/// Entry point for the `gwf` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Ingest(args) => handle_ingest(args),
        Command::Forecast(args) => handle_forecast(args),
        Command::Sample(args) => handle_sample(args),
    }
}

/// `RUST_LOG` takes precedence; otherwise `-v` raises the level from `info`.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));

    // A second init (e.g. from tests) is harmless; keep the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

fn handle_ingest(args: IngestArgs) -> Result<(), AppError> {
    let settings = ingest_settings_from_args(Settings::from_env()?, &args)?;
    ingest_command(&settings, args).map(|_| ())
}

/// Run an ingest and print its summary. An input with no usable rows is not an
/// error: the loader still clears the collection and logs a warning.
fn ingest_command(settings: &Settings, args: IngestArgs) -> Result<pipeline::IngestRun, AppError> {
    let mapping = ColumnMapping {
        entity: args.entity_column,
        timestamp: args.date_column,
        value: args.value_column,
        drop: args.drop_columns,
    };
    let policy = RetryPolicy {
        backoff: Duration::from_millis(args.retry_backoff_ms),
        pacing: Duration::from_millis(args.pacing_ms),
    };

    let run = pipeline::run_ingest(settings, &args.csv, mapping, policy)?;
    println!("{}", crate::report::format_ingest_summary(&run, settings));
    Ok(run)
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let settings = forecast_settings_from_args(Settings::from_env()?, &args)?;

    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());

    forecast_command(&settings, &args, cancel).map(|_| ())
}

fn forecast_command(
    settings: &Settings,
    args: &ForecastArgs,
    cancel: CancelToken,
) -> Result<pipeline::ForecastRun, AppError> {
    let options = pipeline::ForecastOptions {
        jobs: args.jobs.max(1),
        fourier_order: args.fourier_order,
    };
    let run = pipeline::run_forecast(settings, options, cancel)?;
    println!("{}", crate::report::format_forecast_summary(&run));
    Ok(run)
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        regions: args.regions,
        start_year: args.start_year,
        years: args.years,
        per_year: args.per_year,
        seed: args.seed,
        dirty_fraction: args.dirty_fraction,
    };
    let rows = generate_sample(&config)?;
    write_sample_csv(&args.out, &rows)?;

    println!("Wrote {} rows for {} regions to {}", rows.len(), config.regions, args.out.display());
    Ok(())
}

/// First Ctrl-C interrupts the current region's fit; a second one while that
/// interrupt is still pending exits immediately.
fn install_interrupt_handler(cancel: CancelToken) {
    let result = ctrlc::set_handler(move || {
        if cancel.is_cancelled() {
            eprintln!("Interrupted again, exiting.");
            std::process::exit(INTERRUPTED_EXIT);
        }
        tracing::warn!("interrupt received; abandoning the current region");
        cancel.cancel();
    });
    if let Err(e) = result {
        tracing::warn!(error = %e, "could not install Ctrl-C handler");
    }
}

fn apply_store_overrides(settings: &mut Settings, store: &StoreArgs) {
    if let Some(path) = &store.store_path {
        settings.store_path = path.clone();
    }
    if let Some(database) = &store.database {
        settings.database = database.clone();
    }
    if let Some(collection) = &store.collection {
        settings.collection = collection.clone();
    }
}

fn ingest_settings_from_args(mut settings: Settings, args: &IngestArgs) -> Result<Settings, AppError> {
    apply_store_overrides(&mut settings, &args.store);
    if let Some(batch_size) = args.batch_size {
        settings.batch_size = batch_size;
    }
    settings.validate()?;
    Ok(settings)
}

pub fn forecast_settings_from_args(mut settings: Settings, args: &ForecastArgs) -> Result<Settings, AppError> {
    apply_store_overrides(&mut settings, &args.store);
    if let Some(n) = args.min_points {
        settings.min_data_points = n;
    }
    if let Some(years) = args.years {
        settings.years_to_predict = years;
    }
    if let Some(confidence) = args.confidence {
        settings.confidence_interval = confidence;
    }
    if let Some(dir) = &args.output_dir {
        settings.output_dir = dir.clone();
    }
    settings.validate()?;
    Ok(settings)
}
