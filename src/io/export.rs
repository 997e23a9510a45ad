//! Export forecast horizons to CSV.
//!
//! One row per `(entity, period)`; meant to be easy to consume in spreadsheets
//! or downstream scripts.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::EntityForecast;
use crate::error::AppError;

pub const FORECASTS_FILE: &str = "forecasts.csv";

#[derive(Debug, Serialize)]
struct ForecastRow<'a> {
    state: &'a str,
    period: String,
    point_estimate: String,
    lower_bound: String,
    upper_bound: String,
    risk: &'static str,
}

/// Write every horizon point to a CSV file.
pub fn write_forecasts_csv(path: &Path, forecasts: &[EntityForecast]) -> Result<(), AppError> {
    let file = std::fs::File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_forecasts(file, forecasts)
        .map_err(|e| AppError::runtime(format!("Failed to write export CSV '{}': {e}", path.display())))
}

const HEADER: [&str; 6] = ["state", "period", "point_estimate", "lower_bound", "upper_bound", "risk"];

/// Write forecast rows to any writer. The header is written even when there
/// are no rows.
pub fn write_forecasts<W: Write>(writer: W, forecasts: &[EntityForecast]) -> Result<(), csv::Error> {
    let mut out = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    out.write_record(HEADER)?;

    for forecast in forecasts {
        for (point, risk) in forecast.horizon.iter().zip(&forecast.risks) {
            out.serialize(ForecastRow {
                state: &forecast.entity_id,
                period: point.period.format("%Y-%m-%d").to_string(),
                point_estimate: format!("{:.4}", point.point_estimate),
                lower_bound: format!("{:.4}", point.lower_bound),
                upper_bound: format!("{:.4}", point.upper_bound),
                risk: risk.label(),
            })?;
        }
    }

    out.flush()?;
    Ok(())
}
