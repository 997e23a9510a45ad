//! Time coordinates and the yearly Fourier basis.
//!
//! The seasonal-trend model regresses on:
//!
//! - `t`: years elapsed since the first observation (trend term)
//! - `sin(2πk·φ)`, `cos(2πk·φ)` for `k = 1..=order`, where `φ` is the date
//!   measured in years since the Unix epoch
//!
//! Anchoring the phase to the epoch (not the first observation) keeps the
//! seasonal terms comparable across entities with different start dates.

use std::f64::consts::TAU;

use chrono::NaiveDate;

/// Mean Gregorian year length in days.
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Years between `origin` and `date` (negative when `date < origin`).
pub fn years_between(origin: NaiveDate, date: NaiveDate) -> f64 {
    (date - origin).num_days() as f64 / DAYS_PER_YEAR
}

/// Seasonal phase of `date`, in years since 1970-01-01.
pub fn seasonal_phase(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    years_between(epoch, date)
}

/// Write `2 * order` Fourier terms for `phase` into `out` as `[sin1, cos1, sin2, cos2, ...]`.
///
/// # Panics
/// Panics if `out.len() < 2 * order`.
pub fn fill_fourier(phase: f64, order: usize, out: &mut [f64]) {
    for k in 1..=order {
        let arg = TAU * k as f64 * phase;
        out[2 * (k - 1)] = arg.sin();
        out[2 * (k - 1) + 1] = arg.cos();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn years_between_is_signed() {
        let a = d(2020, 1, 1);
        let b = d(2021, 1, 1);
        assert!((years_between(a, b) - 366.0 / DAYS_PER_YEAR).abs() < 1e-12);
        assert!(years_between(b, a) < 0.0);
    }

    #[test]
    fn fourier_terms_repeat_yearly() {
        let order = 3;
        let mut a = vec![0.0; 2 * order];
        let mut b = vec![0.0; 2 * order];
        let phase = seasonal_phase(d(2010, 6, 15));
        fill_fourier(phase, order, &mut a);
        fill_fourier(phase + 4.0, order, &mut b);
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-9);
        }
    }

    #[test]
    fn zero_order_writes_nothing() {
        let mut out: Vec<f64> = Vec::new();
        fill_fourier(0.3, 0, &mut out);
        assert!(out.is_empty());
    }
}
