//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - stored observations (`CleanRecord`) and per-entity history (`TimeSeries`)
//! - forecast outputs (`ForecastPoint`, `ForecastHorizon`, `EntityForecast`)
//! - risk tiers and run counters (`RiskTier`, `RunSummary`, `EntityReport`)
//! - runtime configuration (`Settings`)

pub mod settings;
pub mod types;

pub use settings::*;
pub use types::*;
