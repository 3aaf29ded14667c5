//! Engine Errors
//!
//! Every failure surfaced by the engine is a deterministic validation failure.
//! There is no I/O inside the engine boundary, so nothing here is retryable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reasons an engine call can fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    /// A balance record violates a required invariant.
    InvalidRecord {
        country: String,
        commodity: String,
        reason: String,
    },

    /// Shock fraction outside `[0, 1]` or not finite.
    InvalidShockMagnitude { value: f64 },

    /// Both scenarios of a comparison use the same shock.
    InvalidComparison { shock: f64 },

    /// Drilldown requested for a country absent from the record set.
    CountryNotFound { country: String },
}

impl EngineError {
    pub(crate) fn invalid_record(
        country: impl Into<String>,
        commodity: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            country: country.into(),
            commodity: commodity.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable label, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRecord { .. } => "invalid_record",
            Self::InvalidShockMagnitude { .. } => "invalid_shock_magnitude",
            Self::InvalidComparison { .. } => "invalid_comparison",
            Self::CountryNotFound { .. } => "country_not_found",
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRecord {
                country,
                commodity,
                reason,
            } => write!(f, "Invalid record {}/{}: {}", country, commodity, reason),
            Self::InvalidShockMagnitude { value } => write!(
                f,
                "Invalid shock magnitude {}: expected a fraction in [0, 1]",
                value
            ),
            Self::InvalidComparison { shock } => write!(
                f,
                "Invalid comparison: both scenarios use shock {}",
                shock
            ),
            Self::CountryNotFound { country } => {
                write!(f, "No records for country '{}'", country)
            }
        }
    }
}

impl std::error::Error for EngineError {}
