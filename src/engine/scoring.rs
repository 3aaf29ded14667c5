//! Structural Risk Scorer
//!
//! Scores how fragile a country–commodity balance is, independent of any
//! particular shock:
//!
//! ```text
//! risk_score = w1 * import_dependency
//!            + w2 * import_volatility
//!            + w3 * production_volatility        clamped to [0, 1]
//! ```
//!
//! Weights and band thresholds are configuration. Shortfall (how large a given
//! disruption is) and risk (how well any disruption could be absorbed) stay
//! separate outputs.

use crate::engine::error::EngineError;
use crate::engine::record::{is_unit_interval, BalanceRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for the weights summing to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Weights of the three fragility drivers. Must be non-negative and sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    #[serde(default = "default_import_dependency_weight")]
    pub import_dependency: f64,
    #[serde(default = "default_volatility_weight")]
    pub import_volatility: f64,
    #[serde(default = "default_volatility_weight")]
    pub production_volatility: f64,
}

fn default_import_dependency_weight() -> f64 {
    0.5
}
fn default_volatility_weight() -> f64 {
    0.25
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            import_dependency: default_import_dependency_weight(),
            import_volatility: default_volatility_weight(),
            production_volatility: default_volatility_weight(),
        }
    }
}

impl RiskWeights {
    pub fn sum(&self) -> f64 {
        self.import_dependency + self.import_volatility + self.production_volatility
    }
}

/// Lower bounds of the Medium and High bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    #[serde(default = "default_medium_threshold")]
    pub medium: f64,
    #[serde(default = "default_high_threshold")]
    pub high: f64,
}

fn default_medium_threshold() -> f64 {
    0.33
}
fn default_high_threshold() -> f64 {
    0.66
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            medium: default_medium_threshold(),
            high: default_high_threshold(),
        }
    }
}

impl BandThresholds {
    pub fn band(&self, score: f64) -> RiskBand {
        if score >= self.high {
            RiskBand::High
        } else if score >= self.medium {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }
}

/// Scoring configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskConfig {
    #[serde(default)]
    pub weights: RiskWeights,
    #[serde(default)]
    pub bands: BandThresholds,
}

impl RiskConfig {
    pub fn validate(&self) -> Result<(), RiskConfigError> {
        let w = &self.weights;
        for (name, value) in [
            ("import_dependency", w.import_dependency),
            ("import_volatility", w.import_volatility),
            ("production_volatility", w.production_volatility),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RiskConfigError::NegativeWeight {
                    name: name.to_string(),
                    value,
                });
            }
        }
        if (w.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RiskConfigError::WeightSum { sum: w.sum() });
        }

        let b = &self.bands;
        let ordered = b.medium > 0.0 && b.medium < b.high && b.high <= 1.0;
        if !ordered {
            return Err(RiskConfigError::BandOrder {
                medium: b.medium,
                high: b.high,
            });
        }
        Ok(())
    }
}

/// Invalid scoring configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskConfigError {
    NegativeWeight { name: String, value: f64 },
    WeightSum { sum: f64 },
    BandOrder { medium: f64, high: f64 },
}

impl fmt::Display for RiskConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeWeight { name, value } => {
                write!(f, "weight '{}' must be finite and >= 0, got {}", name, value)
            }
            Self::WeightSum { sum } => write!(f, "weights must sum to 1, got {}", sum),
            Self::BandOrder { medium, high } => write!(
                f,
                "band thresholds must satisfy 0 < medium < high <= 1, got medium={} high={}",
                medium, high
            ),
        }
    }
}

impl std::error::Error for RiskConfigError {}

// =============================================================================
// RESULTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

impl RiskBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Medium => "Medium",
            RiskBand::High => "High",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted share of each driver in the raw score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskContributions {
    pub import_dependency: f64,
    pub import_volatility: f64,
    pub production_volatility: f64,
}

impl RiskContributions {
    pub fn total(&self) -> f64 {
        self.import_dependency + self.import_volatility + self.production_volatility
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub risk_score: f64,
    pub risk_band: RiskBand,
    pub contributions: RiskContributions,
}

// =============================================================================
// SCORER
// =============================================================================

/// Scores records under a fixed [`RiskConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskScorer {
    config: RiskConfig,
}

impl RiskScorer {
    pub fn new(config: RiskConfig) -> Result<Self, RiskConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn score(&self, record: &BalanceRecord) -> Result<RiskResult, EngineError> {
        let dependency = record.import_dependency();
        if !is_unit_interval(dependency) {
            return Err(record.invalid(format!(
                "import_dependency must lie in [0, 1], got {}",
                dependency
            )));
        }
        let import_volatility =
            required_index(record, "import_volatility", record.import_volatility())?;
        let production_volatility =
            required_index(record, "production_volatility", record.production_volatility())?;

        let w = &self.config.weights;
        let contributions = RiskContributions {
            import_dependency: w.import_dependency * dependency,
            import_volatility: w.import_volatility * import_volatility,
            production_volatility: w.production_volatility * production_volatility,
        };
        let risk_score = contributions.total().clamp(0.0, 1.0);

        Ok(RiskResult {
            risk_score,
            risk_band: self.config.bands.band(risk_score),
            contributions,
        })
    }
}

/// Score `record` with the default weights and thresholds.
pub fn score(record: &BalanceRecord) -> Result<RiskResult, EngineError> {
    RiskScorer::default().score(record)
}

fn required_index(
    record: &BalanceRecord,
    name: &str,
    value: Option<f64>,
) -> Result<f64, EngineError> {
    match value {
        Some(v) if is_unit_interval(v) => Ok(v),
        Some(v) => Err(record.invalid(format!("{} must lie in [0, 1], got {}", name, v))),
        None => Err(record.invalid(format!("{} is missing", name))),
    }
}
