//! Shared command workflows.
//!
//! Keeping these in one place keeps `app.rs` focused on argument handling and
//! presentation:
//!
//! - ingest: CSV -> clean -> batched load
//! - forecast: store -> per-region forecasts -> charts + exports

use std::path::{Path, PathBuf};

use crate::domain::Settings;
use crate::error::AppError;
use crate::fit::{CancelToken, SeasonalTrendModel};
use crate::forecast::EntityForecaster;
use crate::io::{
    CleanReport, ColumnMapping, FORECASTS_FILE, RecordCleaner, SUMMARY_FILE, SummaryFile, read_csv,
    write_forecasts_csv, write_summary_json,
};
use crate::loader::{BatchIngestor, IngestOutcome, LogProgress, RetryPolicy};
use crate::models::HorizonSpec;
use crate::pipeline::{PipelineRunner, RunReport};
use crate::plot::SvgChartRenderer;
use crate::store::FileStore;

/// All outputs of a `gwf ingest` run.
#[derive(Debug, Clone)]
pub struct IngestRun {
    pub clean: CleanReport,
    pub outcome: IngestOutcome,
}

/// All outputs of a `gwf forecast` run.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub report: RunReport,
    pub summary_path: PathBuf,
    pub forecasts_path: PathBuf,
}

/// Knobs of the forecast command that are not part of `Settings`.
#[derive(Debug, Clone, Copy)]
pub struct ForecastOptions {
    pub jobs: usize,
    pub fourier_order: usize,
}

pub fn run_ingest(
    settings: &Settings,
    csv: &Path,
    mapping: ColumnMapping,
    policy: RetryPolicy,
) -> Result<IngestRun, AppError> {
    // 1) Read + check schema before touching the store.
    let table = read_csv(csv)?;
    let missing = mapping.missing_columns(&table.headers);
    if !missing.is_empty() {
        return Err(AppError::config(format!(
            "CSV '{}' is missing required column(s): {}. Found: {}",
            csv.display(),
            missing.join(", "),
            table.headers.join(", ")
        )));
    }

    // 2) Clean.
    let cleaned = RecordCleaner::new(mapping).clean(table);
    tracing::info!(
        rows_read = cleaned.report.rows_read,
        rows_kept = cleaned.report.rows_kept,
        "cleaned source rows"
    );

    // 3) Load (full replace).
    let store = FileStore::open(&settings.store_path, &settings.database)?;
    let collection = store.collection(&settings.collection);
    tracing::info!(store = %store.dir().display(), collection = %settings.collection, "replacing collection");
    let outcome = BatchIngestor::new(&collection, settings.batch_size)
        .with_policy(policy)
        .ingest(&cleaned.records, &mut LogProgress)?;

    Ok(IngestRun {
        clean: cleaned.report,
        outcome,
    })
}

pub fn run_forecast(
    settings: &Settings,
    options: ForecastOptions,
    cancel: CancelToken,
) -> Result<ForecastRun, AppError> {
    let store = FileStore::open(&settings.store_path, &settings.database)?;
    let collection = store.collection(&settings.collection);
    tracing::info!(store = %store.dir().display(), collection = %settings.collection, "reading collection");

    let model = SeasonalTrendModel::new(options.fourier_order).with_cancel(cancel);
    let spec = HorizonSpec {
        periods: settings.years_to_predict,
        interval_width: settings.confidence_interval,
    };
    let renderer = SvgChartRenderer::new(&settings.output_dir)?;

    let runner = PipelineRunner::new(
        &collection,
        EntityForecaster::new(model, spec),
        renderer,
        settings.min_data_points,
    );
    let report = runner.run_parallel(options.jobs)?;
    if report.summary.total_entities == 0 {
        tracing::warn!(collection = %settings.collection, "no entities found; run `gwf ingest` first");
    }

    let forecasts_path = settings.output_dir.join(FORECASTS_FILE);
    write_forecasts_csv(&forecasts_path, &report.forecasts)?;

    let summary_path = settings.output_dir.join(SUMMARY_FILE);
    let file = SummaryFile::new(
        report.summary,
        report.entities.clone(),
        settings.years_to_predict,
        settings.confidence_interval,
    );
    write_summary_json(&summary_path, &file)?;

    Ok(ForecastRun {
        report,
        summary_path,
        forecasts_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleConfig, generate_sample, write_sample_csv};
    use crate::domain::EntityStatus;

    fn settings_in(dir: &Path) -> Settings {
        Settings {
            store_path: dir.join("store"),
            output_dir: dir.join("out"),
            batch_size: 50,
            ..Settings::default()
        }
    }

    #[test]
    fn ingest_then_forecast_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("levels.csv");
        let sample = SampleConfig { regions: 3, years: 8, per_year: 4, dirty_fraction: 0.0, ..SampleConfig::default() };
        write_sample_csv(&csv, &generate_sample(&sample).unwrap()).unwrap();

        let settings = settings_in(dir.path());
        let ingest = run_ingest(&settings, &csv, ColumnMapping::default(), RetryPolicy::immediate()).unwrap();
        assert_eq!(ingest.clean.rows_kept, 96);
        assert_eq!(ingest.outcome.inserted, 96);
        assert_eq!(ingest.outcome.batches, 2);

        let options = ForecastOptions { jobs: 2, fourier_order: 3 };
        let run = run_forecast(&settings, options, CancelToken::new()).unwrap();

        assert_eq!(run.report.summary.total_entities, 3);
        assert_eq!(run.report.summary.succeeded, 3);
        assert!(run.report.entities.iter().all(|e| e.status == EntityStatus::Succeeded));
        for entity in &run.report.entities {
            assert!(entity.artifact.as_ref().is_some_and(|p| p.exists()));
        }

        let exported = std::fs::read_to_string(&run.forecasts_path).unwrap();
        // Header + 3 regions x 5 periods.
        assert_eq!(exported.lines().count(), 1 + 15);
        assert!(run.summary_path.exists());
    }

    #[test]
    fn missing_columns_are_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("bad.csv");
        std::fs::write(&csv, "Region,When,Level\nA,2020-01-01,4.0\n").unwrap();

        let err = run_ingest(&settings_in(dir.path()), &csv, ColumnMapping::default(), RetryPolicy::immediate())
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("State"));
    }

    #[test]
    fn forecasting_an_empty_store_reports_zero_entities() {
        let dir = tempfile::tempdir().unwrap();
        let options = ForecastOptions { jobs: 2, fourier_order: 3 };
        let run = run_forecast(&settings_in(dir.path()), options, CancelToken::new()).unwrap();

        assert_eq!(run.report.summary.total_entities, 0);
        assert!(run.report.entities.is_empty());
        let exported = std::fs::read_to_string(&run.forecasts_path).unwrap();
        assert_eq!(exported.lines().count(), 1);
        assert!(run.summary_path.exists());
    }

    #[test]
    fn ingesting_only_unusable_rows_empties_the_collection() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());

        let good = dir.path().join("good.csv");
        std::fs::write(&good, "State,Date,Water_Level_m_bgl\nGoa,2020-01-01,4.0\n").unwrap();
        run_ingest(&settings, &good, ColumnMapping::default(), RetryPolicy::immediate()).unwrap();

        let blank = dir.path().join("blank.csv");
        std::fs::write(&blank, "State,Date,Water_Level_m_bgl\nGoa,2020-01-01,\n,2020-02-01,3.0\n").unwrap();
        let run = run_ingest(&settings, &blank, ColumnMapping::default(), RetryPolicy::immediate()).unwrap();

        assert_eq!(run.clean.rows_read, 2);
        assert_eq!(run.outcome.inserted, 0);
        let store = FileStore::open(&settings.store_path, &settings.database).unwrap();
        let docs = crate::store::Collection::find(&store.collection(&settings.collection), &crate::store::Filter::all(), None)
            .unwrap();
        assert!(docs.is_empty());
    }
}
