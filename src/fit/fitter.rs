//! Seasonal-trend model fitting.
//!
//! Given an entity's history `(date_i, y_i)` we solve one ridge-regularized
//! least squares problem for:
//!
//! ```text
//! y(date) = β0 + β1·t + Σ_k [a_k sin(2πk·φ) + b_k cos(2πk·φ)]
//! ```
//!
//! i.e. a linear trend plus yearly seasonality. There are no weekly or daily
//! terms since observations are at most a few per year.
//!
//! Prediction bands use the classical regression prediction interval:
//!
//! ```text
//! ŷ ± t_{(1+w)/2, n-p} · σ · sqrt(1 + x₀ᵀ (XᵀX + Λ)⁻¹ x₀)
//! ```
//!
//! which widens naturally as the horizon extrapolates the trend.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::domain::{ForecastPoint, TimeSeries};
use crate::fit::cancel::CancelToken;
use crate::math::solve_ridge;
use crate::models::{ForecastModel, HorizonSpec, ModelError, column_count, fill_design_row, future_year_ends};

/// Residual degrees of freedom kept free when choosing the Fourier order.
const MIN_RESIDUAL_DOF: usize = 2;

pub const DEFAULT_FOURIER_ORDER: usize = 3;
pub const DEFAULT_SEASONALITY_PENALTY: f64 = 0.5;

/// Linear trend + yearly Fourier seasonality.
#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    /// Maximum number of yearly harmonics. Reduced automatically for short series.
    pub fourier_order: usize,
    /// Ridge penalty on the seasonal coefficients.
    pub seasonality_penalty: f64,
    cancel: Option<CancelToken>,
}

impl Default for SeasonalTrendModel {
    fn default() -> Self {
        Self {
            fourier_order: DEFAULT_FOURIER_ORDER,
            seasonality_penalty: DEFAULT_SEASONALITY_PENALTY,
            cancel: None,
        }
    }
}

/// A fitted seasonal-trend model for one entity.
#[derive(Debug, Clone)]
pub struct SeasonalTrendFit {
    pub origin: NaiveDate,
    pub last_observed: NaiveDate,
    /// Observation dates, ascending (duplicates kept).
    pub history: Vec<NaiveDate>,
    /// Fourier order actually used.
    pub order: usize,
    pub betas: Vec<f64>,
    covariance: DMatrix<f64>,
    /// Residual standard deviation.
    pub sigma: f64,
    pub dof: usize,
    pub rmse: f64,
}

impl SeasonalTrendModel {
    pub fn new(fourier_order: usize) -> Self {
        Self {
            fourier_order,
            ..Self::default()
        }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Largest order `<= fourier_order` leaving enough residual degrees of freedom.
    pub fn effective_order(&self, n: usize) -> Option<usize> {
        (0..=self.fourier_order)
            .rev()
            .find(|&k| n >= column_count(k) + MIN_RESIDUAL_DOF)
    }

    /// Consumes a pending interrupt. Only the fit that wins the swap fails, so
    /// concurrent fits sharing the token lose one entity per Ctrl-C.
    fn check_cancel(&self) -> Result<(), ModelError> {
        match &self.cancel {
            Some(token) if token.reset() => Err(ModelError::Interrupted),
            _ => Ok(()),
        }
    }
}

impl ForecastModel for SeasonalTrendModel {
    type Fitted = SeasonalTrendFit;

    fn fit(&self, series: &TimeSeries) -> Result<SeasonalTrendFit, ModelError> {
        self.check_cancel()?;

        let obs = series.observations();
        let n = obs.len();
        let order = self.effective_order(n).ok_or(ModelError::TooFewPoints {
            needed: column_count(0) + MIN_RESIDUAL_DOF,
            got: n,
        })?;
        if obs.iter().any(|o| !o.value.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let (Some(origin), Some(last_observed)) = (series.first_timestamp(), series.last_timestamp()) else {
            return Err(ModelError::TooFewPoints { needed: 1, got: 0 });
        };

        let p = column_count(order);
        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut y = DVector::<f64>::zeros(n);
        let mut row = vec![0.0; p];
        for (i, o) in obs.iter().enumerate() {
            fill_design_row(origin, o.timestamp, order, &mut row);
            for (j, v) in row.iter().enumerate() {
                x[(i, j)] = *v;
            }
            y[i] = o.value;
        }

        // Trend and intercept are free; only the seasonal columns are shrunk.
        let penalty: Vec<f64> = (0..p)
            .map(|j| if j < 2 { 0.0 } else { self.seasonality_penalty.max(0.0) })
            .collect();

        self.check_cancel()?;
        let solution = solve_ridge(&x, &y, &penalty).ok_or(ModelError::IllConditioned)?;
        self.check_cancel()?;

        let residuals = &y - &x * &solution.beta;
        let sse = residuals.norm_squared();
        let dof = n - p;
        let sigma = (sse / dof as f64).sqrt();
        let rmse = (sse / n as f64).sqrt();
        if !(sigma.is_finite() && rmse.is_finite()) {
            return Err(ModelError::IllConditioned);
        }

        tracing::debug!(
            entity = series.entity_id(),
            n,
            order,
            rmse,
            "fitted seasonal-trend model"
        );

        Ok(SeasonalTrendFit {
            origin,
            last_observed,
            history: obs.iter().map(|o| o.timestamp).collect(),
            order,
            betas: solution.beta.iter().copied().collect(),
            covariance: solution.covariance,
            sigma,
            dof,
            rmse,
        })
    }

    fn predict(&self, fitted: &SeasonalTrendFit, spec: &HorizonSpec) -> Result<Vec<ForecastPoint>, ModelError> {
        let w = spec.interval_width;
        if !(w.is_finite() && w > 0.0 && w < 1.0) {
            return Err(ModelError::InvalidHorizon(format!("interval width {w} is outside (0, 1)")));
        }

        let future = future_year_ends(fitted.last_observed, spec.periods)
            .ok_or_else(|| ModelError::InvalidHorizon("horizon overflows the calendar".to_string()))?;

        let dist = StudentsT::new(0.0, 1.0, fitted.dof as f64).map_err(|_| ModelError::IllConditioned)?;
        let q = dist.inverse_cdf(0.5 + w / 2.0);
        if !q.is_finite() {
            return Err(ModelError::IllConditioned);
        }

        let p = column_count(fitted.order);
        let mut row = DVector::<f64>::zeros(p);
        let mut buf = vec![0.0; p];

        fitted
            .history
            .iter()
            .chain(future.iter())
            .map(|&date| {
                fill_design_row(fitted.origin, date, fitted.order, &mut buf);
                row.copy_from_slice(&buf);

                let estimate: f64 = buf.iter().zip(&fitted.betas).map(|(x, b)| x * b).sum();
                let leverage = (row.transpose() * &fitted.covariance * &row)[(0, 0)].max(0.0);
                let half = q * fitted.sigma * (1.0 + leverage).sqrt();
                if !(estimate.is_finite() && half.is_finite()) {
                    return Err(ModelError::IllConditioned);
                }

                Ok(ForecastPoint {
                    period: date,
                    point_estimate: estimate,
                    lower_bound: estimate - half,
                    upper_bound: estimate + half,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// Quarterly series following `level - drop·t + amp·sin(2πφ)` plus a small wobble.
    fn quarterly_series(years: i32, level: f64, drop: f64, amp: f64) -> TimeSeries {
        let origin = d(2010, 1, 15);
        let mut obs = Vec::new();
        for year in 0..years {
            for (q, month) in [1u32, 4, 7, 10].iter().enumerate() {
                let date = d(2010 + year, *month, 15);
                let t = crate::math::years_between(origin, date);
                let phase = crate::math::seasonal_phase(date);
                let wobble = if (year as usize + q) % 2 == 0 { 0.05 } else { -0.05 };
                let value = level - drop * t + amp * (std::f64::consts::TAU * phase).sin() + wobble;
                obs.push(Observation { timestamp: date, value });
            }
        }
        TimeSeries::new("X", obs)
    }

    #[test]
    fn recovers_trend_on_synthetic_series() {
        let series = quarterly_series(8, 10.0, 0.4, 1.0);
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&series).unwrap();

        assert_eq!(fit.order, DEFAULT_FOURIER_ORDER);
        assert!((fit.betas[1] + 0.4).abs() < 0.05, "trend slope {}", fit.betas[1]);
        assert!(fit.rmse < 0.2);
    }

    #[test]
    fn predict_covers_history_then_future_year_ends() {
        let series = quarterly_series(4, 6.0, 0.2, 0.5);
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&series).unwrap();
        let spec = HorizonSpec { periods: 5, interval_width: 0.9 };

        let out = model.predict(&fit, &spec).unwrap();
        assert_eq!(out.len(), series.len() + 5);

        let tail = &out[out.len() - 5..];
        assert_eq!(tail[0].period, d(2013, 12, 31));
        assert_eq!(tail[4].period, d(2017, 12, 31));
        for p in tail {
            assert!(p.is_well_formed());
        }
        // Bands widen as the trend is extrapolated.
        let width = |p: &ForecastPoint| p.upper_bound - p.lower_bound;
        assert!(width(&tail[4]) > width(&tail[0]));
    }

    #[test]
    fn short_series_reduces_order_or_fails() {
        let model = SeasonalTrendModel::default();
        assert_eq!(model.effective_order(10), Some(3));
        assert_eq!(model.effective_order(6), Some(1));
        assert_eq!(model.effective_order(4), Some(0));
        assert_eq!(model.effective_order(3), None);

        let series = TimeSeries::new(
            "S",
            (0..3)
                .map(|i| Observation { timestamp: d(2000 + i, 1, 1), value: 1.0 })
                .collect(),
        );
        assert!(matches!(model.fit(&series), Err(ModelError::TooFewPoints { got: 3, .. })));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut obs: Vec<Observation> = (0..10)
            .map(|i| Observation { timestamp: d(2000 + i, 3, 1), value: 5.0 })
            .collect();
        obs[4].value = f64::NAN;
        let series = TimeSeries::new("N", obs);
        assert_eq!(SeasonalTrendModel::default().fit(&series).unwrap_err(), ModelError::NonFinite);
    }

    #[test]
    fn cancelled_token_interrupts_fit() {
        let token = CancelToken::new();
        token.cancel();
        let model = SeasonalTrendModel::default().with_cancel(token.clone());
        let series = quarterly_series(3, 5.0, 0.1, 0.3);
        assert_eq!(model.fit(&series).unwrap_err(), ModelError::Interrupted);

        // The interrupt was consumed by the failed fit.
        assert!(!token.is_cancelled());
        assert!(model.fit(&series).is_ok());
    }

    #[test]
    fn invalid_interval_width_is_rejected() {
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&quarterly_series(3, 5.0, 0.1, 0.3)).unwrap();
        let spec = HorizonSpec { periods: 2, interval_width: 1.0 };
        assert!(matches!(model.predict(&fit, &spec), Err(ModelError::InvalidHorizon(_))));
    }
}
