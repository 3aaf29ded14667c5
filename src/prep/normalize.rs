//! Shock magnitude normalization.
//!
//! Callers speak in percentages ("35", "35%") as often as in fractions
//! ("0.35"). The engine only accepts fractions, so conversion happens here.

use crate::engine::{EngineError, ShockFraction};

/// Interpret `value` as a fraction when it lies in `[0, 1]` and as a whole
/// percentage when it lies in `(1, 100]`. Anything else is rejected.
///
/// `1` is read as total loss, not as one percent.
pub fn normalize_shock(value: f64) -> Result<ShockFraction, EngineError> {
    if !value.is_finite() || value < 0.0 {
        return Err(EngineError::InvalidShockMagnitude { value });
    }
    if value <= 1.0 {
        ShockFraction::new(value)
    } else if value <= 100.0 {
        ShockFraction::new(value / 100.0)
    } else {
        Err(EngineError::InvalidShockMagnitude { value })
    }
}

/// Parse `"0.35"`, `"35"` or `"35%"`. A trailing `%` always means percent.
pub fn parse_shock(text: &str) -> Result<ShockFraction, EngineError> {
    let trimmed = text.trim();
    let invalid = || EngineError::InvalidShockMagnitude { value: f64::NAN };

    if let Some(percent) = trimmed.strip_suffix('%') {
        let value: f64 = percent.trim().parse().map_err(|_| invalid())?;
        if !(0.0..=100.0).contains(&value) {
            return Err(EngineError::InvalidShockMagnitude { value });
        }
        return ShockFraction::new(value / 100.0);
    }

    let value: f64 = trimmed.parse().map_err(|_| invalid())?;
    normalize_shock(value)
}
