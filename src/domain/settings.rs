//! Process-wide settings, read once at startup.
//!
//! Values come from the environment (optionally seeded from a `.env` file) and
//! may be overridden by CLI flags afterwards. The resulting struct is passed
//! explicitly into every component constructor.

use std::path::PathBuf;

use crate::error::AppError;

pub const DEFAULT_MIN_DATA_POINTS: usize = 10;
pub const DEFAULT_YEARS_TO_PREDICT: usize = 5;
pub const DEFAULT_CONFIDENCE_INTERVAL: f64 = 0.90;
pub const DEFAULT_BATCH_SIZE: usize = 5000;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Root directory of the document store.
    pub store_path: PathBuf,
    pub database: String,
    pub collection: String,
    /// Minimum observations per entity before a forecast is attempted.
    pub min_data_points: usize,
    /// Number of future yearly periods in each horizon.
    pub years_to_predict: usize,
    /// Probability mass between lower and upper forecast bounds.
    pub confidence_interval: f64,
    pub batch_size: usize,
    /// Directory receiving charts and the run summary.
    pub output_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data"),
            database: "groundwater".to_string(),
            collection: "raw_data".to_string(),
            min_data_points: DEFAULT_MIN_DATA_POINTS,
            years_to_predict: DEFAULT_YEARS_TO_PREDICT,
            confidence_interval: DEFAULT_CONFIDENCE_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            output_dir: PathBuf::from("predictions"),
        }
    }
}

impl Settings {
    /// Load settings from `.env` + the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings from an arbitrary key lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Settings::default();

        let settings = Settings {
            store_path: get("STORE_PATH").map(PathBuf::from).unwrap_or(defaults.store_path),
            database: get("STORE_DATABASE").unwrap_or(defaults.database),
            collection: get("STORE_COLLECTION").unwrap_or(defaults.collection),
            min_data_points: parse_or("MIN_DATA_POINTS", get("MIN_DATA_POINTS"), defaults.min_data_points)?,
            years_to_predict: parse_or("YEARS_TO_PREDICT", get("YEARS_TO_PREDICT"), defaults.years_to_predict)?,
            confidence_interval: parse_or(
                "CONFIDENCE_INTERVAL",
                get("CONFIDENCE_INTERVAL"),
                defaults.confidence_interval,
            )?,
            batch_size: parse_or("BATCH_SIZE", get("BATCH_SIZE"), defaults.batch_size)?,
            output_dir: get("OUTPUT_DIR").map(PathBuf::from).unwrap_or(defaults.output_dir),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.min_data_points == 0 {
            return Err(AppError::config("MIN_DATA_POINTS must be > 0."));
        }
        if self.years_to_predict == 0 {
            return Err(AppError::config("YEARS_TO_PREDICT must be > 0."));
        }
        if !(self.confidence_interval.is_finite() && self.confidence_interval > 0.0 && self.confidence_interval < 1.0) {
            return Err(AppError::config("CONFIDENCE_INTERVAL must be in (0, 1)."));
        }
        if self.batch_size == 0 {
            return Err(AppError::config("BATCH_SIZE must be > 0."));
        }
        if self.database.is_empty() || self.collection.is_empty() {
            return Err(AppError::config("Store database and collection names must be non-empty."));
        }
        Ok(())
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AppError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| AppError::config(format!("Invalid value for {key}: '{raw}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.min_data_points, 10);
        assert_eq!(settings.years_to_predict, 5);
        assert_eq!(settings.batch_size, 5000);
        assert_eq!(settings.output_dir, PathBuf::from("predictions"));
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_lookup(lookup(&[
            ("MIN_DATA_POINTS", "12"),
            ("CONFIDENCE_INTERVAL", " 0.8 "),
            ("STORE_COLLECTION", "levels"),
            ("BATCH_SIZE", ""),
        ]))
        .unwrap();
        assert_eq!(settings.min_data_points, 12);
        assert!((settings.confidence_interval - 0.8).abs() < 1e-12);
        assert_eq!(settings.collection, "levels");
        assert_eq!(settings.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn rejects_invalid_values() {
        let err = Settings::from_lookup(lookup(&[("BATCH_SIZE", "lots")])).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = Settings::from_lookup(lookup(&[("CONFIDENCE_INTERVAL", "1.5")])).unwrap_err();
        assert!(err.message().contains("CONFIDENCE_INTERVAL"));

        assert!(Settings::from_lookup(lookup(&[("YEARS_TO_PREDICT", "0")])).is_err());
    }
}
