//! Write the run summary JSON.
//!
//! The file captures the counters of a forecast run plus one entry per entity,
//! so a later invocation (or a dashboard) can inspect what happened without
//! parsing logs.

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EntityReport, RunSummary};
use crate::error::AppError;

pub const SUMMARY_FILE: &str = "run_summary.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryFile {
    pub tool: String,
    pub generated_at: DateTime<Utc>,
    pub years_to_predict: usize,
    pub confidence_interval: f64,
    pub summary: RunSummary,
    pub entities: Vec<EntityReport>,
}

impl SummaryFile {
    pub fn new(
        summary: RunSummary,
        entities: Vec<EntityReport>,
        years_to_predict: usize,
        confidence_interval: f64,
    ) -> Self {
        Self {
            tool: "gwf".to_string(),
            generated_at: Utc::now(),
            years_to_predict,
            confidence_interval,
            summary,
            entities,
        }
    }
}

/// Write a run summary JSON file.
pub fn write_summary_json(path: &Path, file: &SummaryFile) -> Result<(), AppError> {
    let out = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(out, file)
        .map_err(|e| AppError::runtime(format!("Failed to write summary JSON '{}': {e}", path.display())))
}
