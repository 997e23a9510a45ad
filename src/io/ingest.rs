//! CSV reading and record cleaning.
//!
//! This module is responsible for turning a groundwater CSV export into a clean
//! set of `(state, date, water_level)` records that are safe to store.
//!
//! Design goals:
//! - **Strict schema** for the mapped columns (clear errors + exit code 2)
//! - **Row-level tolerance** (skip bad rows, but count what happened)
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no store logic here

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use serde::Serialize;

use crate::domain::CleanRecord;
use crate::error::AppError;

/// Source column labels for the three semantic fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
    pub entity: String,
    pub timestamp: String,
    pub value: String,
    /// Columns discarded outright (not carried as extras).
    pub drop: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            entity: "State".to_string(),
            timestamp: "Date".to_string(),
            value: "Water_Level_m_bgl".to_string(),
            drop: vec!["Time".to_string()],
        }
    }
}

impl ColumnMapping {
    /// Mapped labels that do not appear in `headers`.
    pub fn missing_columns(&self, headers: &[String]) -> Vec<String> {
        [&self.entity, &self.timestamp, &self.value]
            .into_iter()
            .filter(|label| !headers.iter().any(|h| same_label(h, label)))
            .cloned()
            .collect()
    }
}

/// One raw row: `(source label, cell)` pairs in header order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based source line (header is line 1).
    pub line: usize,
    pub fields: Vec<(String, String)>,
}

impl RawRecord {
    fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(h, _)| same_label(h, label))
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// All rows of a source file plus rows the CSV reader could not decode.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub records: Vec<RawRecord>,
    pub unreadable: usize,
}

/// Before/after counts of a cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub rows_read: usize,
    pub rows_kept: usize,
    pub unreadable: usize,
    pub missing_entity: usize,
    pub missing_value: usize,
    pub invalid_timestamp: usize,
}

impl CleanReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}

/// Output of a cleaning pass.
#[derive(Debug, Clone, Default)]
pub struct Cleaned {
    pub records: Vec<CleanRecord>,
    pub report: CleanReport,
}

/// Read a CSV file into raw rows.
pub fn read_csv(path: &Path) -> Result<RawTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::config(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_csv_from(file)
}

/// Read CSV rows from any reader.
pub fn read_csv_from<R: Read>(reader: R) -> Result<RawTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::config(format!("Failed to read CSV headers: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();

    let mut table = RawTable {
        headers,
        ..RawTable::default()
    };

    for (idx, result) in reader.records().enumerate() {
        // +2 because:
        // - records() starts at line 1 after headers
        // - CSV is 1-based line numbers
        let line = idx + 2;
        match result {
            Ok(record) => table.records.push(to_raw(line, &table.headers, &record)),
            Err(e) => {
                tracing::debug!(line, error = %e, "unreadable CSV row");
                table.unreadable += 1;
            }
        }
    }

    Ok(table)
}

fn to_raw(line: usize, headers: &[String], record: &StringRecord) -> RawRecord {
    RawRecord {
        line,
        fields: headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| (h.clone(), v.to_string()))
            .collect(),
    }
}

/// Renames, parses, and filters raw rows into `CleanRecord`s.
#[derive(Debug, Clone, Default)]
pub struct RecordCleaner {
    mapping: ColumnMapping,
}

impl RecordCleaner {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    /// Clean a whole table. Never fails; malformed rows are counted and dropped.
    pub fn clean(&self, table: RawTable) -> Cleaned {
        let mut report = CleanReport {
            rows_read: table.records.len() + table.unreadable,
            unreadable: table.unreadable,
            ..CleanReport::default()
        };

        let mut records = Vec::with_capacity(table.records.len());
        for raw in &table.records {
            match self.clean_one(raw) {
                Ok(record) => records.push(record),
                Err(Rejection::MissingEntity) => report.missing_entity += 1,
                Err(Rejection::MissingValue) => report.missing_value += 1,
                Err(Rejection::InvalidTimestamp) => report.invalid_timestamp += 1,
            }
        }
        report.rows_kept = records.len();

        Cleaned { records, report }
    }

    fn clean_one(&self, raw: &RawRecord) -> Result<CleanRecord, Rejection> {
        let m = &self.mapping;
        let entity_id = raw.get(&m.entity).ok_or(Rejection::MissingEntity)?;
        let value = raw.get(&m.value).and_then(parse_value).ok_or(Rejection::MissingValue)?;
        let timestamp = raw.get(&m.timestamp).and_then(parse_date).ok_or(Rejection::InvalidTimestamp)?;

        let extras: BTreeMap<String, String> = raw
            .fields
            .iter()
            .filter(|(h, _)| !self.is_mapped_or_dropped(h))
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(h, v)| (h.clone(), v.trim().to_string()))
            .collect();

        Ok(CleanRecord {
            entity_id: entity_id.to_string(),
            timestamp,
            value,
            extras,
        })
    }

    fn is_mapped_or_dropped(&self, header: &str) -> bool {
        let m = &self.mapping;
        [&m.entity, &m.timestamp, &m.value]
            .into_iter()
            .chain(m.drop.iter())
            .any(|label| same_label(header, label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    MissingEntity,
    MissingValue,
    InvalidTimestamp,
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, the mapped column is never found.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn same_label(header: &str, label: &str) -> bool {
    header.trim().eq_ignore_ascii_case(label.trim())
}

/// Parse a date cell; anything unrecognized is treated as missing.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    // ISO dates are preferred, but groundwater exports often use day-first
    // forms. We accept a small fixed set to keep parsing deterministic.
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

    let s = s.trim();
    DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FMTS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn parse_value(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    const SAMPLE: &str = "\u{feff}State,District,Date,Time,Water_Level_m_bgl\n\
        Kerala,Idukki,2020-01-15,10:00,4.2\n\
        Kerala,Idukki,15/04/2020,10:00,3.9\n\
        Kerala,Idukki,not-a-date,10:00,3.5\n\
        ,Idukki,2020-10-15,10:00,3.1\n\
        Kerala,Idukki,2021-01-15,10:00,\n\
        Kerala,Idukki,2021-04-15,10:00,NaN\n\
        Goa,North Goa,2021-04-15 08:30:00,08:30,7.75\n";

    #[test]
    fn cleans_and_counts_rows() {
        let table = read_csv_from(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.headers[0], "State");

        let cleaned = RecordCleaner::default().clean(table);
        let r = cleaned.report;
        assert_eq!(r.rows_read, 7);
        assert_eq!(r.rows_kept, 3);
        assert_eq!(r.invalid_timestamp, 1);
        assert_eq!(r.missing_entity, 1);
        assert_eq!(r.missing_value, 2);
        assert_eq!(r.rows_dropped(), 4);

        let first = &cleaned.records[0];
        assert_eq!(first.entity_id, "Kerala");
        assert_eq!(first.timestamp, d(2020, 1, 15));
        assert!((first.value - 4.2).abs() < 1e-12);
        assert_eq!(first.extras.get("District").map(String::as_str), Some("Idukki"));
        assert!(!first.extras.contains_key("Time"));

        assert_eq!(cleaned.records[1].timestamp, d(2020, 4, 15));
        assert_eq!(cleaned.records[2].timestamp, d(2021, 4, 15));
    }

    #[test]
    fn custom_mapping_is_case_insensitive() {
        let csv = "region,obs_date,level\nA,2020-01-01,5.5\n";
        let mapping = ColumnMapping {
            entity: "Region".to_string(),
            timestamp: "OBS_DATE".to_string(),
            value: "Level".to_string(),
            drop: Vec::new(),
        };
        let table = read_csv_from(csv.as_bytes()).unwrap();
        assert!(mapping.missing_columns(&table.headers).is_empty());

        let cleaned = RecordCleaner::new(mapping).clean(table);
        assert_eq!(cleaned.records.len(), 1);
        assert!(cleaned.records[0].extras.is_empty());
    }

    #[test]
    fn reports_missing_mapped_columns() {
        let table = read_csv_from("State,Level\nA,1\n".as_bytes()).unwrap();
        let missing = ColumnMapping::default().missing_columns(&table.headers);
        assert_eq!(missing, vec!["Date".to_string(), "Water_Level_m_bgl".to_string()]);
    }

    #[test]
    fn date_parsing_accepts_common_forms() {
        assert_eq!(parse_date("2021-03-04"), Some(d(2021, 3, 4)));
        assert_eq!(parse_date("04/03/2021"), Some(d(2021, 3, 4)));
        assert_eq!(parse_date("2021/03/04"), Some(d(2021, 3, 4)));
        assert_eq!(parse_date("2021-03-04T12:00:00"), Some(d(2021, 3, 4)));
        assert_eq!(parse_date("2021-03-04T12:00:00+05:30"), Some(d(2021, 3, 4)));
        assert_eq!(parse_date("31/02/2021"), None);
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn empty_table_cleans_to_nothing() {
        let cleaned = RecordCleaner::default().clean(RawTable::default());
        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.report, CleanReport::default());
    }
}
