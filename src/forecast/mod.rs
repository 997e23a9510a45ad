//! Per-entity forecasting: fit, extract the future horizon, classify risk.
//!
//! The caller is responsible for the `MIN_DATA_POINTS` check; insufficient
//! history is a skip decision made by the pipeline, not an error raised here.

use chrono::NaiveDate;

use crate::domain::{EntityForecast, ForecastHorizon, ForecastPoint, RiskTier, TimeSeries};
use crate::models::{ForecastModel, HorizonSpec, ModelError};

pub mod risk;

pub use risk::*;

/// Why a single entity could not be forecast.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("model training failed for `{entity}`: {source}")]
    ModelTraining {
        entity: String,
        #[source]
        source: ModelError,
    },
    #[error("forecast interrupted for `{entity}`")]
    Interrupted { entity: String },
    #[error("model output for `{entity}` is malformed: {reason}")]
    MalformedOutput { entity: String, reason: String },
}

impl ForecastError {
    fn from_model(entity: &str, source: ModelError) -> Self {
        match source {
            ModelError::Interrupted => ForecastError::Interrupted {
                entity: entity.to_string(),
            },
            source => ForecastError::ModelTraining {
                entity: entity.to_string(),
                source,
            },
        }
    }
}

/// Fits a model per entity and turns its prediction into a classified horizon.
#[derive(Debug, Clone)]
pub struct EntityForecaster<M> {
    model: M,
    spec: HorizonSpec,
}

impl<M: ForecastModel> EntityForecaster<M> {
    pub fn new(model: M, spec: HorizonSpec) -> Self {
        Self { model, spec }
    }

    pub fn forecast(&self, entity_id: &str, history: &TimeSeries) -> Result<EntityForecast, ForecastError> {
        let Some(last_observed) = history.last_timestamp() else {
            return Err(ForecastError::ModelTraining {
                entity: entity_id.to_string(),
                source: ModelError::TooFewPoints { needed: 1, got: 0 },
            });
        };

        let fitted = self
            .model
            .fit(history)
            .map_err(|e| ForecastError::from_model(entity_id, e))?;
        let predicted = self
            .model
            .predict(&fitted, &self.spec)
            .map_err(|e| ForecastError::from_model(entity_id, e))?;

        let horizon = extract_horizon(predicted, self.spec.periods, last_observed).map_err(|reason| {
            ForecastError::MalformedOutput {
                entity: entity_id.to_string(),
                reason,
            }
        })?;

        let risks: Vec<RiskTier> = horizon.iter().map(|p| classify(p.point_estimate)).collect();
        let outlook = RiskTier::most_severe(risks.iter().copied()).unwrap_or(RiskTier::Safe);

        Ok(EntityForecast {
            entity_id: entity_id.to_string(),
            last_observed,
            horizon,
            risks,
            outlook,
        })
    }
}

/// Take the final `periods` rows and check the horizon invariants.
fn extract_horizon(
    mut predicted: Vec<ForecastPoint>,
    periods: usize,
    last_observed: NaiveDate,
) -> Result<ForecastHorizon, String> {
    if predicted.len() < periods {
        return Err(format!(
            "expected at least {periods} predicted periods, got {}",
            predicted.len()
        ));
    }
    let tail = predicted.split_off(predicted.len() - periods);

    if let Some(first) = tail.first() {
        if first.period <= last_observed {
            return Err(format!(
                "first horizon period {} is not after last observation {last_observed}",
                first.period
            ));
        }
    }
    if tail.windows(2).any(|w| w[1].period <= w[0].period) {
        return Err("horizon periods are not strictly increasing".to_string());
    }
    if let Some(bad) = tail.iter().find(|p| !p.is_well_formed()) {
        return Err(format!("invalid bounds at {}", bad.period));
    }

    Ok(ForecastHorizon::from_validated(tail))
}
