//! Risk classification of groundwater levels.

use crate::domain::RiskTier;

/// Levels below this are an emergency.
pub const EMERGENCY_BELOW: f64 = 3.0;
/// Levels below this (and at or above `EMERGENCY_BELOW`) are a warning.
pub const WARNING_BELOW: f64 = 5.0;

/// Classify a level. Lower bounds are inclusive: `3.0` is a warning, `5.0` is safe.
///
/// `NaN` compares false against both thresholds and lands in `Emergency`.
pub fn classify(level: f64) -> RiskTier {
    if level >= WARNING_BELOW {
        RiskTier::Safe
    } else if level >= EMERGENCY_BELOW {
        RiskTier::Warning
    } else {
        RiskTier::Emergency
    }
}
