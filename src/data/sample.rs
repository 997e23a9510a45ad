//! Synthetic groundwater CSV generation.
//!
//! Each region gets its own baseline depth, long-run drift, and seasonal swing
//! (shallowest after the monsoon, deepest before it), plus Gaussian noise.
//! Optionally a fraction of rows is deliberately corrupted so the cleaning
//! stage has something to do.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::error::AppError;

const REGIONS: [(&str, &str); 16] = [
    ("Andhra Pradesh", "Guntur"),
    ("Bihar", "Patna"),
    ("Goa", "North Goa"),
    ("Gujarat", "Kutch"),
    ("Haryana", "Karnal"),
    ("Karnataka", "Kolar"),
    ("Kerala", "Idukki"),
    ("Madhya Pradesh", "Indore"),
    ("Maharashtra", "Pune"),
    ("Odisha", "Cuttack"),
    ("Punjab", "Ludhiana"),
    ("Rajasthan", "Jodhpur"),
    ("Tamil Nadu", "Coimbatore"),
    ("Telangana", "Nalgonda"),
    ("Uttar Pradesh", "Agra"),
    ("West Bengal", "Bankura"),
];

/// Measurement months, in the order they are used as `per_year` grows.
const MONTHS: [u32; 12] = [1, 5, 8, 11, 3, 10, 6, 12, 2, 7, 4, 9];

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub regions: usize,
    pub start_year: i32,
    pub years: usize,
    pub per_year: usize,
    pub seed: u64,
    /// Share of rows in `[0, 1)` emitted with a blank or unparsable field.
    pub dirty_fraction: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            regions: 8,
            start_year: 2005,
            years: 15,
            per_year: 4,
            seed: 42,
            dirty_fraction: 0.02,
        }
    }
}

/// One CSV row, fields kept as text so dirty rows can be represented.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRow {
    pub state: String,
    pub district: String,
    pub date: String,
    pub time: String,
    pub water_level: String,
}

pub fn generate_sample(config: &SampleConfig) -> Result<Vec<SampleRow>, AppError> {
    if config.regions == 0 || config.regions > REGIONS.len() {
        return Err(AppError::config(format!(
            "Region count must be between 1 and {}.",
            REGIONS.len()
        )));
    }
    if config.years == 0 {
        return Err(AppError::config("Year count must be > 0."));
    }
    if config.per_year == 0 || config.per_year > MONTHS.len() {
        return Err(AppError::config("Measurements per year must be between 1 and 12."));
    }
    if !(0.0..1.0).contains(&config.dirty_fraction) {
        return Err(AppError::config("Dirty fraction must be in [0, 1)."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, 0.25).map_err(|e| AppError::runtime(format!("Noise distribution error: {e}")))?;

    let mut months: Vec<u32> = MONTHS[..config.per_year].to_vec();
    months.sort_unstable();

    let mut rows = Vec::with_capacity(config.regions * config.years * config.per_year);
    for &(state, district) in &REGIONS[..config.regions] {
        let base = rng.gen_range(3.0..12.0);
        let drift = rng.gen_range(-0.15..0.35);
        let swing = rng.gen_range(0.3..1.5);

        for y in 0..config.years {
            let year = config.start_year + y as i32;
            for &month in &months {
                let Some(date) = NaiveDate::from_ymd_opt(year, month, 15) else {
                    continue;
                };
                // Deepest in May (pre-monsoon), shallowest in November.
                let seasonal = swing * (std::f64::consts::TAU * (month as f64 - 2.0) / 12.0).sin();
                let level = (base + drift * y as f64 + seasonal + noise.sample(&mut rng)).max(0.05);

                let mut row = SampleRow {
                    state: state.to_string(),
                    district: district.to_string(),
                    date: date.format("%Y-%m-%d").to_string(),
                    time: format!("{:02}:00", rng.gen_range(6..18)),
                    water_level: format!("{level:.2}"),
                };
                if rng.gen_bool(config.dirty_fraction) {
                    corrupt(&mut row, &mut rng);
                }
                rows.push(row);
            }
        }
    }

    Ok(rows)
}

fn corrupt(row: &mut SampleRow, rng: &mut StdRng) {
    match rng.gen_range(0..4) {
        0 => row.water_level.clear(),
        1 => row.date = "unknown".to_string(),
        2 => row.state.clear(),
        _ => row.water_level = "n/a".to_string(),
    }
}

/// Write rows with the column labels of the public groundwater exports.
pub fn write_sample_csv(path: &Path, rows: &[SampleRow]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::runtime(format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    write_sample(file, rows)
        .map_err(|e| AppError::runtime(format!("Failed to write sample CSV '{}': {e}", path.display())))
}

pub fn write_sample<W: Write>(writer: W, rows: &[SampleRow]) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["State", "District", "Date", "Time", "Water_Level_m_bgl"])?;
    for r in rows {
        out.write_record([&r.state, &r.district, &r.date, &r.time, &r.water_level])?;
    }
    out.flush()?;
    Ok(())
}
