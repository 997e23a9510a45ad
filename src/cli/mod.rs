//! Command-line parsing for the groundwater forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the ingestion/modeling code.
//!
//! Settings flags are `Option`s: when a flag is absent the value from the
//! environment (or `.env`) is used, and failing that the built-in default.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "gwf", version, about = "Groundwater level ingestion and per-region forecasting")]
pub struct Cli {
    /// Increase log verbosity from info (-v debug, -vv trace). `RUST_LOG` wins when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean a groundwater CSV and load it into the store (replacing prior contents).
    Ingest(IngestArgs),
    /// Forecast every region in the store, writing charts and a run summary.
    Forecast(ForecastArgs),
    /// Write a synthetic groundwater CSV for demos.
    Sample(SampleArgs),
}

/// Which collection to read from / write to.
#[derive(Debug, Args, Clone, Default)]
pub struct StoreArgs {
    /// Store root directory [env: STORE_PATH].
    #[arg(long = "store", value_name = "DIR")]
    pub store_path: Option<PathBuf>,

    /// Database name under the store root [env: STORE_DATABASE].
    #[arg(long)]
    pub database: Option<String>,

    /// Collection name [env: STORE_COLLECTION].
    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct IngestArgs {
    /// Source CSV file.
    #[arg(long, value_name = "CSV")]
    pub csv: PathBuf,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Column holding the region name.
    #[arg(long, default_value = "State")]
    pub entity_column: String,

    /// Column holding the measurement date.
    #[arg(long, default_value = "Date")]
    pub date_column: String,

    /// Column holding the water level (m below ground level).
    #[arg(long, default_value = "Water_Level_m_bgl")]
    pub value_column: String,

    /// Columns to discard (repeatable).
    #[arg(long = "drop-column", default_values_t = vec!["Time".to_string()])]
    pub drop_columns: Vec<String>,

    /// Records per insert batch [env: BATCH_SIZE].
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Wait before retrying a failed batch.
    #[arg(long, default_value_t = 2000)]
    pub retry_backoff_ms: u64,

    /// Pause between batches.
    #[arg(long, default_value_t = 500)]
    pub pacing_ms: u64,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Regions with fewer observations are skipped [env: MIN_DATA_POINTS].
    #[arg(long)]
    pub min_points: Option<usize>,

    /// Number of future year-end periods [env: YEARS_TO_PREDICT].
    #[arg(long)]
    pub years: Option<usize>,

    /// Prediction interval width in (0, 1) [env: CONFIDENCE_INTERVAL].
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Directory for charts, forecasts.csv, and run_summary.json [env: OUTPUT_DIR].
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Worker threads; 1 processes regions sequentially.
    #[arg(short, long, default_value_t = 1)]
    pub jobs: usize,

    /// Maximum yearly Fourier order of the seasonal component.
    #[arg(long, default_value_t = crate::fit::DEFAULT_FOURIER_ORDER)]
    pub fourier_order: usize,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of regions (1-16).
    #[arg(long, default_value_t = 8)]
    pub regions: usize,

    /// First year of data.
    #[arg(long, default_value_t = 2005)]
    pub start_year: i32,

    /// Years of history per region.
    #[arg(long, default_value_t = 15)]
    pub years: usize,

    /// Measurements per year (1-12).
    #[arg(long, default_value_t = 4)]
    pub per_year: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Share of rows written with a blank or unparsable field.
    #[arg(long, default_value_t = 0.02)]
    pub dirty_fraction: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_forecast_flags() {
        let cli = Cli::parse_from(["gwf", "-vv", "forecast", "--years", "3", "--jobs", "4", "--store", "/tmp/s"]);
        assert_eq!(cli.verbose, 2);
        let Command::Forecast(args) = cli.command else {
            panic!("expected forecast");
        };
        assert_eq!(args.years, Some(3));
        assert_eq!(args.jobs, 4);
        assert_eq!(args.min_points, None);
        assert_eq!(args.store.store_path, Some(PathBuf::from("/tmp/s")));
    }

    #[test]
    fn ingest_defaults_match_public_export() {
        let cli = Cli::parse_from(["gwf", "ingest", "--csv", "data.csv"]);
        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(args.entity_column, "State");
        assert_eq!(args.value_column, "Water_Level_m_bgl");
        assert_eq!(args.drop_columns, vec!["Time".to_string()]);
        assert_eq!(args.batch_size, None);
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
