//! Per-entity forecast orchestration.
//!
//! Histories are read in one scan of the collection, then for every distinct
//! entity:
//!
//! skip if short -> forecast -> render chart
//!
//! No single entity failure stops the run. Outcomes are folded into a
//! `RunSummary` by one aggregator, both in sequential and parallel mode.

use std::path::PathBuf;
use std::sync::mpsc;

use rayon::prelude::*;

use crate::domain::{EntityForecast, EntityReport, EntityStatus, RunSummary, TimeSeries};
use crate::forecast::{EntityForecaster, ForecastError};
use crate::models::ForecastModel;
use crate::plot::{ArtifactSink, RenderError};
use crate::store::{Collection, StoreError, load_all_series};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("could not read entity histories: {0}")]
    Enumerate(#[source] StoreError),
    #[error("could not start worker pool: {0}")]
    ThreadPool(String),
}

/// Why one entity did not produce an artifact.
#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error("load failed: {0}")]
    Load(#[source] StoreError),
    #[error(transparent)]
    Forecast(ForecastError),
    #[error("render failed: {0}")]
    Render(#[source] RenderError),
}

#[derive(Debug)]
pub enum EntityOutcome {
    Succeeded {
        forecast: EntityForecast,
        artifact: PathBuf,
        points: usize,
    },
    /// Fewer than the minimum number of observations.
    Skipped { points: usize },
    Failed { points: usize, error: EntityError },
}

/// Everything a forecast run produced.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub summary: RunSummary,
    /// One entry per entity, ordered by entity id.
    pub entities: Vec<EntityReport>,
    /// Successful forecasts, ordered by entity id.
    pub forecasts: Vec<EntityForecast>,
}

pub struct PipelineRunner<'a, C: ?Sized, M, S> {
    collection: &'a C,
    forecaster: EntityForecaster<M>,
    sink: S,
    min_points: usize,
}

impl<'a, C, M, S> PipelineRunner<'a, C, M, S>
where
    C: Collection + ?Sized,
    M: ForecastModel,
    S: ArtifactSink,
{
    pub fn new(collection: &'a C, forecaster: EntityForecaster<M>, sink: S, min_points: usize) -> Self {
        Self {
            collection,
            forecaster,
            sink,
            min_points,
        }
    }

    /// Process entities one at a time, in sorted order.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let entities = load_all_series(self.collection).map_err(PipelineError::Enumerate)?;
        tracing::info!(entities = entities.len(), "starting forecast run");

        let mut agg = Aggregator::default();
        for (entity, series) in entities {
            let outcome = self.process_entity(&entity, series);
            agg.record(entity, outcome);
        }
        Ok(agg.finish())
    }

    /// Process entities on a bounded pool of `jobs` workers.
    ///
    /// Outcomes are streamed to an aggregator on the calling thread, so the
    /// report matches `run()` regardless of completion order.
    pub fn run_parallel(&self, jobs: usize) -> Result<RunReport, PipelineError>
    where
        C: Sync,
        M: Sync,
        S: Sync,
    {
        if jobs <= 1 {
            return self.run();
        }

        let entities = load_all_series(self.collection).map_err(PipelineError::Enumerate)?;
        tracing::info!(entities = entities.len(), jobs, "starting parallel forecast run");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("gwf-worker-{i}"))
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;

        let (tx, rx) = mpsc::channel::<(String, EntityOutcome)>();
        let mut agg = Aggregator::default();

        std::thread::scope(|scope| {
            scope.spawn(move || {
                pool.install(|| {
                    entities.into_par_iter().for_each_with(tx, |tx, (entity, series)| {
                        let outcome = self.process_entity(&entity, series);
                        // The receiver outlives every sender inside this scope.
                        let _ = tx.send((entity, outcome));
                    });
                });
            });

            for (entity, outcome) in rx {
                agg.record(entity, outcome);
            }
        });

        Ok(agg.finish())
    }

    fn process_entity(&self, entity: &str, series: Result<TimeSeries, StoreError>) -> EntityOutcome {
        let series = match series {
            Ok(series) => series,
            Err(e) => {
                return EntityOutcome::Failed {
                    points: 0,
                    error: EntityError::Load(e),
                };
            }
        };

        let points = series.len();
        if points < self.min_points {
            return EntityOutcome::Skipped { points };
        }

        let forecast = match self.forecaster.forecast(entity, &series) {
            Ok(forecast) => forecast,
            Err(e) => {
                return EntityOutcome::Failed {
                    points,
                    error: EntityError::Forecast(e),
                };
            }
        };

        match self.sink.render(entity, &forecast.horizon) {
            Ok(artifact) => EntityOutcome::Succeeded {
                forecast,
                artifact,
                points,
            },
            Err(e) => EntityOutcome::Failed {
                points,
                error: EntityError::Render(e),
            },
        }
    }
}

/// Single owner of the run counters.
#[derive(Default)]
struct Aggregator {
    summary: RunSummary,
    entities: Vec<EntityReport>,
    forecasts: Vec<EntityForecast>,
}

impl Aggregator {
    fn record(&mut self, entity_id: String, outcome: EntityOutcome) {
        let report = match outcome {
            EntityOutcome::Succeeded {
                forecast,
                artifact,
                points,
            } => {
                tracing::info!(
                    entity = %entity_id,
                    points,
                    outlook = %forecast.outlook,
                    artifact = %artifact.display(),
                    "forecast complete"
                );
                let report = EntityReport {
                    entity_id,
                    status: EntityStatus::Succeeded,
                    points,
                    outlook: Some(forecast.outlook),
                    artifact: Some(artifact),
                    error: None,
                };
                self.forecasts.push(forecast);
                report
            }
            EntityOutcome::Skipped { points } => {
                tracing::warn!(entity = %entity_id, points, "skipping: not enough data points");
                EntityReport {
                    entity_id,
                    status: EntityStatus::Skipped,
                    points,
                    outlook: None,
                    artifact: None,
                    error: None,
                }
            }
            EntityOutcome::Failed { points, error } => {
                if matches!(error, EntityError::Forecast(ForecastError::Interrupted { .. })) {
                    tracing::warn!(entity = %entity_id, "forecast interrupted; continuing with next entity");
                } else {
                    tracing::error!(entity = %entity_id, error = %error, "forecast failed");
                }
                EntityReport {
                    entity_id,
                    status: EntityStatus::Failed,
                    points,
                    outlook: None,
                    artifact: None,
                    error: Some(error.to_string()),
                }
            }
        };
        self.summary = self.summary.merge(RunSummary::from(report.status));
        self.entities.push(report);
    }

    fn finish(mut self) -> RunReport {
        self.entities.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        self.forecasts.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        let s = self.summary;
        tracing::info!(
            total = s.total_entities,
            succeeded = s.succeeded,
            failed = s.failed,
            skipped = s.skipped,
            "forecast run finished"
        );

        RunReport {
            summary: s,
            entities: self.entities,
            forecasts: self.forecasts,
        }
    }
}
