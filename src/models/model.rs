//! Seasonal-trend model evaluation.
//!
//! The fitter builds one design row per date, both for least squares and for
//! evaluating horizons.
//!
//! Column layout: `[1, t, sin1, cos1, ..., sinK, cosK]`.

use chrono::{Datelike, NaiveDate};

use crate::math::{fill_fourier, seasonal_phase, years_between};

/// Number of regression columns for a Fourier order.
pub fn column_count(order: usize) -> usize {
    2 + 2 * order
}

/// Fill a design row for `date` relative to `origin`.
///
/// # Panics
/// Panics if `out.len() != column_count(order)`.
pub fn fill_design_row(origin: NaiveDate, date: NaiveDate, order: usize, out: &mut [f64]) {
    assert_eq!(out.len(), column_count(order), "design row has wrong width");
    out[0] = 1.0;
    out[1] = years_between(origin, date);
    fill_fourier(seasonal_phase(date), order, &mut out[2..]);
}

/// The `periods` year-end dates strictly after `last`.
///
/// Returns `None` only if the calendar overflows.
pub fn future_year_ends(last: NaiveDate, periods: usize) -> Option<Vec<NaiveDate>> {
    let first_year = if last.month() == 12 && last.day() == 31 {
        last.year() + 1
    } else {
        last.year()
    };
    (0..periods)
        .map(|i| {
            let year = first_year.checked_add(i32::try_from(i).ok()?)?;
            NaiveDate::from_ymd_opt(year, 12, 31)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn design_row_starts_with_intercept_and_time() {
        let origin = d(2000, 1, 1);
        let mut row = vec![0.0; column_count(1)];
        fill_design_row(origin, d(2004, 1, 1), 1, &mut row);
        assert_eq!(row.len(), 4);
        assert_eq!(row[0], 1.0);
        assert!((row[1] - years_between(origin, d(2004, 1, 1))).abs() < 1e-12);
        // sin^2 + cos^2 of the first harmonic.
        assert!((row[2] * row[2] + row[3] * row[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn year_ends_follow_last_observation() {
        assert_eq!(
            future_year_ends(d(2020, 6, 30), 3).unwrap(),
            vec![d(2020, 12, 31), d(2021, 12, 31), d(2022, 12, 31)]
        );
        assert_eq!(
            future_year_ends(d(2020, 12, 31), 2).unwrap(),
            vec![d(2021, 12, 31), d(2022, 12, 31)]
        );
        assert!(future_year_ends(d(2020, 1, 1), 0).unwrap().is_empty());
    }
}
