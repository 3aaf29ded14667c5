//! Engine configuration
//!
//! Risk weights, band thresholds and the shock magnitudes worth precomputing.
//! Loaded from TOML; every field has a default so partial files are fine.

use crate::engine::{EngineError, RiskConfig, RiskConfigError, ShockFraction};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::Path;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "FOODSHOCK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "foodshock.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Shock fractions to precompute for fast retrieval
    #[serde(default = "default_cached_shocks")]
    pub cached_shocks: Vec<f64>,

    /// Shock used when the caller does not pick one
    #[serde(default = "default_shock")]
    pub default_shock: f64,

    /// Ranking length when the caller does not pick one
    #[serde(default = "default_top_n")]
    pub default_top_n: usize,

    /// Upper bound on requested ranking length
    #[serde(default = "default_max_top_n")]
    pub max_top_n: usize,

    /// Scoring weights and band thresholds
    #[serde(default)]
    pub risk: RiskConfig,
}

fn default_cached_shocks() -> Vec<f64> {
    vec![0.2, 0.35, 0.5]
}
fn default_shock() -> f64 {
    0.35
}
fn default_top_n() -> usize {
    20
}
fn default_max_top_n() -> usize {
    200
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cached_shocks: default_cached_shocks(),
            default_shock: default_shock(),
            default_top_n: default_top_n(),
            max_top_n: default_max_top_n(),
            risk: RiskConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from `FOODSHOCK_CONFIG` or the default path.
    ///
    /// Defaults apply only when the file does not exist; a file that exists
    /// but fails to parse or validate is an error.
    pub fn from_env() -> anyhow::Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_or_default(path)
    }

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_toml(&contents)
                .with_context(|| format!("Invalid engine config: {:?}", path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No engine config at {:?}, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read engine config: {:?}", path))
            }
        }
    }

    fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate().map_err(ConfigError::Risk)?;
        self.cached_shock_fractions()?;
        ShockFraction::new(self.default_shock).map_err(ConfigError::Shock)?;
        if self.max_top_n == 0 || self.default_top_n == 0 || self.default_top_n > self.max_top_n
        {
            return Err(ConfigError::TopN {
                default: self.default_top_n,
                max: self.max_top_n,
            });
        }
        Ok(())
    }

    /// Cached shocks as validated fractions, ascending and deduplicated.
    pub fn cached_shock_fractions(&self) -> Result<Vec<ShockFraction>, ConfigError> {
        let mut shocks = self
            .cached_shocks
            .iter()
            .map(|&s| ShockFraction::new(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::Shock)?;
        shocks.sort_by(|a, b| a.value().total_cmp(&b.value()));
        shocks.dedup();
        Ok(shocks)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Risk(RiskConfigError),
    Shock(EngineError),
    TopN { default: usize, max: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Risk(e) => write!(f, "Invalid risk config: {}", e),
            Self::Shock(e) => write!(f, "Invalid shock in config: {}", e),
            Self::TopN { default, max } => write!(
                f,
                "Invalid ranking length: default_top_n={} must be in 1..={}",
                default, max
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
