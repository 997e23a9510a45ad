//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - stored as documents during ingestion
//! - passed between the forecaster, the chart renderer, and the run summary
//! - exported to JSON/CSV at the end of a run

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A cleaned observation, the unit of storage.
///
/// All three core fields are present and `value` is finite. Any extra source
/// columns that survived cleaning are carried along verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    pub entity_id: String,
    pub timestamp: NaiveDate,
    pub value: f64,
    pub extras: BTreeMap<String, String>,
}

impl CleanRecord {
    pub fn new(entity_id: impl Into<String>, timestamp: NaiveDate, value: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            timestamp,
            value,
            extras: BTreeMap::new(),
        }
    }
}

/// One `(timestamp, value)` pair of an entity's history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDate,
    pub value: f64,
}

/// An entity's history, sorted ascending by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    entity_id: String,
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series, sorting observations by timestamp (stable for ties).
    pub fn new(entity_id: impl Into<String>, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self {
            entity_id: entity_id.into(),
            observations,
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.timestamp)
    }
}

/// A single forecast period with its confidence band.
///
/// Invariant: `lower_bound <= point_estimate <= upper_bound`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub period: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl ForecastPoint {
    pub fn is_well_formed(&self) -> bool {
        self.point_estimate.is_finite()
            && self.lower_bound.is_finite()
            && self.upper_bound.is_finite()
            && self.lower_bound <= self.point_estimate
            && self.point_estimate <= self.upper_bound
    }
}

/// The future window extracted from a model prediction.
///
/// Points are chronologically increasing and all lie after the last observed
/// period. The forecaster is the only producer; it validates these properties
/// before constructing a horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastHorizon(Vec<ForecastPoint>);

impl ForecastHorizon {
    pub(crate) fn from_validated(points: Vec<ForecastPoint>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ForecastPoint> {
        self.0.iter()
    }
}

/// Categorical classification of a groundwater level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Emergency,
    Warning,
    Safe,
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::Emergency => "EMERGENCY",
            RiskTier::Warning => "WARNING",
            RiskTier::Safe => "SAFE",
        }
    }

    /// Higher means more urgent.
    pub fn severity(self) -> u8 {
        match self {
            RiskTier::Safe => 0,
            RiskTier::Warning => 1,
            RiskTier::Emergency => 2,
        }
    }

    /// The most urgent tier in `tiers`, or `None` when empty.
    pub fn most_severe(tiers: impl IntoIterator<Item = RiskTier>) -> Option<RiskTier> {
        tiers.into_iter().max_by_key(|t| t.severity())
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A successful per-entity forecast: the horizon plus its risk classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityForecast {
    pub entity_id: String,
    pub last_observed: NaiveDate,
    pub horizon: ForecastHorizon,
    /// Risk tier of each horizon point's estimate, in horizon order.
    pub risks: Vec<RiskTier>,
    /// Most severe tier across the horizon.
    pub outlook: RiskTier,
}

/// Per-run success/failure counters.
///
/// `skipped` entities (too little history) count toward `total_entities` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_entities: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    /// Combine two partial summaries. Associative and commutative.
    pub fn merge(self, other: RunSummary) -> RunSummary {
        RunSummary {
            total_entities: self.total_entities + other.total_entities,
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }
}

impl From<EntityStatus> for RunSummary {
    /// The counters contributed by one entity.
    fn from(status: EntityStatus) -> Self {
        let one = |s| usize::from(status == s);
        RunSummary {
            total_entities: 1,
            succeeded: one(EntityStatus::Succeeded),
            failed: one(EntityStatus::Failed),
            skipped: one(EntityStatus::Skipped),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Succeeded,
    Skipped,
    Failed,
}

/// One line of the per-entity run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity_id: String,
    pub status: EntityStatus,
    /// Number of observations loaded (0 if loading failed).
    pub points: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlook: Option<RiskTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<std::path::PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn time_series_sorts_observations() {
        let series = TimeSeries::new(
            "A",
            vec![
                Observation { timestamp: d(2021, 1, 1), value: 2.0 },
                Observation { timestamp: d(2019, 1, 1), value: 1.0 },
                Observation { timestamp: d(2020, 1, 1), value: 3.0 },
            ],
        );
        let dates: Vec<_> = series.observations().iter().map(|o| o.timestamp).collect();
        assert_eq!(dates, vec![d(2019, 1, 1), d(2020, 1, 1), d(2021, 1, 1)]);
        assert_eq!(series.last_timestamp(), Some(d(2021, 1, 1)));
    }

    #[test]
    fn most_severe_prefers_emergency() {
        let tiers = [RiskTier::Safe, RiskTier::Emergency, RiskTier::Warning];
        assert_eq!(RiskTier::most_severe(tiers), Some(RiskTier::Emergency));
        assert_eq!(RiskTier::most_severe([]), None);
    }

    #[test]
    fn summary_merge_is_commutative() {
        let a = RunSummary { total_entities: 3, succeeded: 1, failed: 1, skipped: 1 };
        let b = RunSummary { total_entities: 2, succeeded: 2, failed: 0, skipped: 0 };
        assert_eq!(a.merge(b), b.merge(a));
        assert_eq!(a.merge(RunSummary::default()), a);
    }

    #[test]
    fn entity_status_counts_once() {
        let folded = [EntityStatus::Succeeded, EntityStatus::Skipped, EntityStatus::Failed, EntityStatus::Succeeded]
            .into_iter()
            .map(RunSummary::from)
            .fold(RunSummary::default(), RunSummary::merge);
        assert_eq!(folded, RunSummary { total_entities: 4, succeeded: 2, failed: 1, skipped: 1 });
    }

    #[test]
    fn forecast_point_rejects_inverted_bounds() {
        let ok = ForecastPoint { period: d(2025, 12, 31), point_estimate: 4.0, lower_bound: 3.0, upper_bound: 5.0 };
        let bad = ForecastPoint { lower_bound: 4.5, ..ok };
        assert!(ok.is_well_formed());
        assert!(!bad.is_well_formed());
    }
}
