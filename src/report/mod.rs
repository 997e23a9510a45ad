//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the ingestion/forecasting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{ForecastRun, IngestRun};
use crate::domain::{EntityStatus, Settings};

/// Summarize a `gwf ingest` run.
pub fn format_ingest_summary(run: &IngestRun, settings: &Settings) -> String {
    let c = &run.clean;
    let mut out = String::new();

    out.push_str("=== gwf - Ingest ===\n");
    out.push_str(&format!(
        "Target: {}/{}/{}\n",
        settings.store_path.display(),
        settings.database,
        settings.collection
    ));
    out.push_str(&format!(
        "Rows: read={} | kept={} | dropped={}\n",
        c.rows_read,
        c.rows_kept,
        c.rows_dropped()
    ));
    if c.rows_dropped() > 0 {
        out.push_str(&format!(
            "  missing region={} | missing level={} | bad date={} | unreadable={}\n",
            c.missing_entity, c.missing_value, c.invalid_timestamp, c.unreadable
        ));
    }
    out.push_str(&format!(
        "Inserted: {} in {} batch(es), {} retr{}\n",
        run.outcome.inserted,
        run.outcome.batches,
        run.outcome.retries,
        if run.outcome.retries == 1 { "y" } else { "ies" }
    ));

    out
}

/// Summarize a `gwf forecast` run: one line per region, then the counters.
pub fn format_forecast_summary(run: &ForecastRun) -> String {
    let report = &run.report;
    let mut out = String::new();

    out.push_str("=== gwf - Forecast ===\n");

    let width = report
        .entities
        .iter()
        .map(|e| e.entity_id.chars().count())
        .max()
        .unwrap_or(0)
        .max(6);
    out.push_str(&format!("{:<width$}  {:<9}  {:>6}  {}\n", "Region", "Status", "Points", "Outlook"));

    for e in &report.entities {
        let status = match e.status {
            EntityStatus::Succeeded => "ok",
            EntityStatus::Skipped => "skipped",
            EntityStatus::Failed => "FAILED",
        };
        let detail = match (&e.outlook, &e.error) {
            (Some(outlook), _) => outlook.label().to_string(),
            (None, Some(err)) => err.clone(),
            (None, None) => "-".to_string(),
        };
        out.push_str(&format!(
            "{:<width$}  {:<9}  {:>6}  {}\n",
            e.entity_id, status, e.points, detail
        ));
    }

    // Emergencies are what readers look for first.
    let emergencies: Vec<&str> = report
        .forecasts
        .iter()
        .filter(|f| f.outlook == crate::domain::RiskTier::Emergency)
        .map(|f| f.entity_id.as_str())
        .collect();
    if !emergencies.is_empty() {
        out.push_str(&format!("\nEmergency outlook: {}\n", emergencies.join(", ")));
    }

    let s = report.summary;
    out.push_str(&format!(
        "\nTotal: {} | succeeded: {} | failed: {} | skipped: {}\n",
        s.total_entities, s.succeeded, s.failed, s.skipped
    ));
    out.push_str(&format!("Forecasts: {}\n", run.forecasts_path.display()));
    out.push_str(&format!("Summary:   {}\n", run.summary_path.display()));

    out
}
