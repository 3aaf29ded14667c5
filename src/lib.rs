//! Food Import Shock Engine
//!
//! Exposes the shock simulation and structural risk engine plus the
//! collaborators that feed it (dataset preparation, filters, shock
//! normalization, result cache, configuration, report rendering).

pub mod cache;
pub mod config;
pub mod engine;
pub mod prep;
pub mod report;

pub use cache::{CacheStats, ShockCache};
pub use config::{ConfigError, EngineConfig};
pub use engine::*;
