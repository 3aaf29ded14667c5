//! Balance Records
//!
//! A [`BalanceRecord`] is one country–commodity food balance for the reference
//! year. Records only enter the engine through [`BalanceRecord::from_input`],
//! which derives apparent consumption and import dependency and enforces:
//!
//! - quantities are finite and non-negative
//! - `consumption = production + imports - exports >= 0`
//! - `0 <= import_dependency <= 1`
//! - volatility indices, when present, lie in `[0, 1]`
//!
//! Once built, a record is immutable for the lifetime of a run.

use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};

/// Negative consumption within this distance of zero is float noise and snaps to zero.
pub const CONSUMPTION_EPSILON: f64 = 1e-9;

/// Unvalidated balance figures as they arrive from upstream preparation.
///
/// Accepts both the engine field names and the upstream column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceInput {
    pub country: String,
    pub commodity: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(alias = "production_qty")]
    pub production: f64,
    #[serde(alias = "import_qty")]
    pub imports: f64,
    #[serde(alias = "export_qty")]
    pub exports: f64,
    #[serde(default, alias = "import_vol_norm")]
    pub import_volatility: Option<f64>,
    #[serde(default, alias = "prod_vol_norm")]
    pub production_volatility: Option<f64>,
}

impl BalanceInput {
    pub fn new(
        country: impl Into<String>,
        commodity: impl Into<String>,
        production: f64,
        imports: f64,
        exports: f64,
    ) -> Self {
        Self {
            country: country.into(),
            commodity: commodity.into(),
            year: None,
            production,
            imports,
            exports,
            import_volatility: None,
            production_volatility: None,
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_volatility(mut self, import_volatility: f64, production_volatility: f64) -> Self {
        self.import_volatility = Some(import_volatility);
        self.production_volatility = Some(production_volatility);
        self
    }
}

/// Identity of a record within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    pub country: String,
    pub commodity: String,
    pub year: Option<i32>,
}

/// Validated country–commodity balance snapshot. Quantities in million tonnes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceRecord {
    pub(crate) country: String,
    pub(crate) commodity: String,
    pub(crate) year: Option<i32>,
    pub(crate) production: f64,
    pub(crate) imports: f64,
    pub(crate) exports: f64,
    pub(crate) consumption: f64,
    pub(crate) import_dependency: f64,
    pub(crate) import_volatility: Option<f64>,
    pub(crate) production_volatility: Option<f64>,
}

impl BalanceRecord {
    /// Validate raw balance figures and derive consumption and import dependency.
    pub fn from_input(input: BalanceInput) -> Result<Self, EngineError> {
        let BalanceInput {
            country,
            commodity,
            year,
            production,
            imports,
            exports,
            import_volatility,
            production_volatility,
        } = input;

        let reject = |reason: String| EngineError::invalid_record(&country, &commodity, reason);

        if country.trim().is_empty() {
            return Err(reject("country identifier is empty".to_string()));
        }
        if commodity.trim().is_empty() {
            return Err(reject("commodity identifier is empty".to_string()));
        }

        for (name, value) in [
            ("production", production),
            ("imports", imports),
            ("exports", exports),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(reject(format!("{} must be finite and >= 0, got {}", name, value)));
            }
        }

        let mut consumption = production + imports - exports;
        if !consumption.is_finite() {
            return Err(reject(format!(
                "apparent consumption overflows ({} + {} - {})",
                production, imports, exports
            )));
        }
        if consumption < 0.0 {
            if consumption > -CONSUMPTION_EPSILON {
                consumption = 0.0;
            } else {
                return Err(reject(format!(
                    "apparent consumption is negative ({})",
                    consumption
                )));
            }
        }

        for (name, value) in [
            ("import_volatility", import_volatility),
            ("production_volatility", production_volatility),
        ] {
            if let Some(v) = value {
                if !is_unit_interval(v) {
                    return Err(reject(format!("{} must lie in [0, 1], got {}", name, v)));
                }
            }
        }

        Ok(Self {
            country,
            commodity,
            year,
            production,
            imports,
            exports,
            consumption,
            import_dependency: import_dependency(imports, consumption),
            import_volatility,
            production_volatility,
        })
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn commodity(&self) -> &str {
        &self.commodity
    }

    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn production(&self) -> f64 {
        self.production
    }

    pub fn imports(&self) -> f64 {
        self.imports
    }

    pub fn exports(&self) -> f64 {
        self.exports
    }

    /// Apparent consumption: `production + imports - exports`.
    pub fn consumption(&self) -> f64 {
        self.consumption
    }

    /// Share of consumption met by imports. Zero when there is no consumption.
    pub fn import_dependency(&self) -> f64 {
        self.import_dependency
    }

    pub fn import_volatility(&self) -> Option<f64> {
        self.import_volatility
    }

    pub fn production_volatility(&self) -> Option<f64> {
        self.production_volatility
    }

    pub fn key(&self) -> RecordKey {
        RecordKey {
            country: self.country.clone(),
            commodity: self.commodity.clone(),
            year: self.year,
        }
    }

    /// Case-insensitive exact match on the trimmed country identifier.
    pub fn matches_country(&self, country: &str) -> bool {
        self.country.trim().to_lowercase() == country.trim().to_lowercase()
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> EngineError {
        EngineError::invalid_record(&self.country, &self.commodity, reason)
    }
}

impl TryFrom<BalanceInput> for BalanceRecord {
    type Error = EngineError;

    fn try_from(input: BalanceInput) -> Result<Self, Self::Error> {
        Self::from_input(input)
    }
}

/// `imports / consumption`, clamped to `[0, 1]`; zero when nothing is consumed.
///
/// Zero consumption is treated as non-dependent. Countries with negligible but
/// non-zero consumption still get the raw ratio.
pub fn import_dependency(imports: f64, consumption: f64) -> f64 {
    if consumption > 0.0 {
        (imports / consumption).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub(crate) fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
