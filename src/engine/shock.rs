//! Shock Simulator
//!
//! Applies an import disruption to a single balance record. The shock is a
//! fraction of *imports*, never of consumption or production, so countries
//! that import little stay insulated even under large shocks.
//!
//! ```text
//! shortfall_abs       = shock * imports
//! shortfall_pct       = shortfall_abs / consumption        (0 when consumption == 0)
//! consumption_shocked = max(consumption - shortfall_abs, 0)
//! ```

use crate::engine::error::EngineError;
use crate::engine::record::{is_unit_interval, BalanceRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated shock magnitude in `[0, 1]`. `1.0` is total import loss.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ShockFraction(f64);

impl ShockFraction {
    pub const ZERO: Self = Self(0.0);
    pub const TOTAL_LOSS: Self = Self(1.0);

    /// Rejects anything outside `[0, 1]` instead of clamping, so unit mistakes
    /// (`35` meant as `0.35`) surface at the call site.
    pub fn new(value: f64) -> Result<Self, EngineError> {
        if is_unit_interval(value) {
            // -0.0 and 0.0 must share a cache key
            Ok(Self(if value == 0.0 { 0.0 } else { value }))
        } else {
            Err(EngineError::InvalidShockMagnitude { value })
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Whole-percent label, e.g. `0.35 -> 35`.
    pub fn percent_key(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    pub(crate) fn bits(self) -> u64 {
        self.0.to_bits()
    }
}

impl TryFrom<f64> for ShockFraction {
    type Error = EngineError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShockFraction> for f64 {
    fn from(shock: ShockFraction) -> Self {
        shock.0
    }
}

impl fmt::Display for ShockFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}%", self.0 * 100.0)
    }
}

/// Outcome of one shock applied to one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShockResult {
    pub shock_fraction: f64,
    /// Consumption lost, million tonnes.
    pub shortfall_abs: f64,
    /// Consumption lost as a fraction of apparent consumption.
    pub shortfall_pct: f64,
    pub consumption_shocked: f64,
    /// Import dependency of what remains; `None` once nothing is consumed.
    pub import_dependency_shocked: Option<f64>,
    pub zero_consumption_after_shock: bool,
    /// Imports larger than apparent consumption (re-export hubs).
    pub imports_exceed_consumption: bool,
}

/// Apply `shock_fraction` to `record`.
pub fn simulate(record: &BalanceRecord, shock_fraction: f64) -> Result<ShockResult, EngineError> {
    simulate_fraction(record, ShockFraction::new(shock_fraction)?)
}

/// Apply an already validated shock to `record`.
pub fn simulate_fraction(
    record: &BalanceRecord,
    shock: ShockFraction,
) -> Result<ShockResult, EngineError> {
    let consumption = record.consumption();
    if !consumption.is_finite() || consumption < 0.0 {
        return Err(record.invalid(format!(
            "apparent consumption must be >= 0, got {}",
            consumption
        )));
    }

    let s = shock.value();
    let imports = record.imports();
    let shortfall_abs = (s * imports).clamp(0.0, imports);
    let shortfall_pct = if consumption > 0.0 {
        shortfall_abs / consumption
    } else {
        0.0
    };

    let consumption_shocked = (consumption - shortfall_abs).max(0.0);
    let import_dependency_shocked = if consumption_shocked > 0.0 {
        Some((imports * (1.0 - s) / consumption_shocked).clamp(0.0, 1.0))
    } else {
        None
    };

    Ok(ShockResult {
        shock_fraction: s,
        shortfall_abs,
        shortfall_pct,
        consumption_shocked,
        import_dependency_shocked,
        zero_consumption_after_shock: consumption_shocked == 0.0,
        imports_exceed_consumption: imports > consumption,
    })
}

/// Source of shock results for the batch engines.
///
/// Implementations must be referentially transparent: the same record and
/// shock always yield the same result.
pub trait ShockModel: Sync {
    fn shock(&self, record: &BalanceRecord, shock: ShockFraction)
        -> Result<ShockResult, EngineError>;
}

/// Computes every result directly with [`simulate_fraction`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectShock;

impl ShockModel for DirectShock {
    fn shock(
        &self,
        record: &BalanceRecord,
        shock: ShockFraction,
    ) -> Result<ShockResult, EngineError> {
        simulate_fraction(record, shock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::record::BalanceInput;

    fn record(production: f64, imports: f64, exports: f64) -> BalanceRecord {
        BalanceRecord::from_input(BalanceInput::new("Malta", "Wheat", production, imports, exports))
            .unwrap()
    }

    #[test]
    fn test_shortfall_is_fraction_of_imports() {
        let r = record(10.0, 4.0, 0.0);
        let result = simulate(&r, 0.5).unwrap();
        assert_eq!(result.shortfall_abs, 2.0);
        assert!((result.shortfall_pct - 2.0 / 14.0).abs() < 1e-12);
        assert_eq!(result.consumption_shocked, 12.0);
        assert!(!result.zero_consumption_after_shock);
    }

    #[test]
    fn test_fully_import_dependent_record() {
        let r = record(0.0, 15.14, 0.0);
        let result = simulate(&r, 0.35).unwrap();
        assert!((result.shortfall_abs - 5.299).abs() < 1e-9);
        assert!((result.shortfall_pct - 0.35).abs() < 1e-12);
        assert_eq!(result.import_dependency_shocked, Some(1.0));
    }

    #[test]
    fn test_total_loss_is_permitted() {
        let r = record(0.0, 3.0, 0.0);
        let result = simulate(&r, 1.0).unwrap();
        assert_eq!(result.shortfall_abs, 3.0);
        assert_eq!(result.shortfall_pct, 1.0);
        assert!(result.zero_consumption_after_shock);
        assert_eq!(result.import_dependency_shocked, None);
    }

    #[test]
    fn test_zero_consumption_never_divides() {
        let r = record(2.0, 3.0, 5.0);
        for shock in [0.0, 0.35, 1.0] {
            let result = simulate(&r, shock).unwrap();
            assert_eq!(result.shortfall_pct, 0.0);
            assert!(result.imports_exceed_consumption);
        }
    }

    #[test]
    fn test_rejects_out_of_range_shock() {
        let r = record(1.0, 1.0, 0.0);
        for bad in [-0.01, 1.01, 35.0, f64::NAN, f64::INFINITY] {
            let err = simulate(&r, bad).unwrap_err();
            assert!(matches!(err, EngineError::InvalidShockMagnitude { .. }));
        }
    }

    #[test]
    fn test_rejects_negative_consumption_defensively() {
        let mut r = record(1.0, 1.0, 0.0);
        r.consumption = -1.0;
        let err = simulate(&r, 0.2).unwrap_err();
        assert!(matches!(err, EngineError::InvalidRecord { .. }));
    }

    #[test]
    fn test_simulate_is_idempotent() {
        let r = record(3.3, 7.7, 1.1);
        let a = simulate(&r, 0.2).unwrap();
        let b = simulate(&r, 0.2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.shortfall_pct.to_bits(), b.shortfall_pct.to_bits());
    }

    #[test]
    fn test_shock_fraction_labels() {
        let shock = ShockFraction::new(0.35).unwrap();
        assert_eq!(shock.percent_key(), 35);
        assert_eq!(shock.to_string(), "35%");
        assert_eq!(ShockFraction::new(-0.0).unwrap().bits(), ShockFraction::ZERO.bits());
    }

    #[test]
    fn test_shock_fraction_deserialization_validates() {
        assert!(serde_json::from_str::<ShockFraction>("0.2").is_ok());
        assert!(serde_json::from_str::<ShockFraction>("20").is_err());
    }
}
