//! Forecasting model interface and the seasonal-trend model primitives.
//!
//! The pipeline treats the model as a black box with a fit/predict contract so
//! it can be tested against fakes. The concrete implementation lives in
//! `crate::fit`.

use crate::domain::{ForecastPoint, TimeSeries};

pub mod model;

pub use model::*;

/// What to predict: how many future periods and how wide the bands are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonSpec {
    pub periods: usize,
    /// Probability mass between lower and upper bound, in `(0, 1)`.
    pub interval_width: f64,
}

/// Errors raised inside a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("need at least {needed} observations to fit, got {got}")]
    TooFewPoints { needed: usize, got: usize },
    #[error("series contains non-finite values")]
    NonFinite,
    #[error("design matrix is ill-conditioned")]
    IllConditioned,
    #[error("invalid horizon: {0}")]
    InvalidHorizon(String),
    #[error("fitting interrupted")]
    Interrupted,
}

/// A forecasting engine.
pub trait ForecastModel {
    type Fitted;

    /// Fit on an entity's full history.
    fn fit(&self, series: &TimeSeries) -> Result<Self::Fitted, ModelError>;

    /// Predict every historical period followed by `spec.periods` future
    /// periods, in chronological order. Callers slice the future tail.
    fn predict(&self, fitted: &Self::Fitted, spec: &HorizonSpec) -> Result<Vec<ForecastPoint>, ModelError>;
}

impl<M: ForecastModel + ?Sized> ForecastModel for &M {
    type Fitted = M::Fitted;

    fn fit(&self, series: &TimeSeries) -> Result<Self::Fitted, ModelError> {
        (**self).fit(series)
    }

    fn predict(&self, fitted: &Self::Fitted, spec: &HorizonSpec) -> Result<Vec<ForecastPoint>, ModelError> {
        (**self).predict(fitted, spec)
    }
}
