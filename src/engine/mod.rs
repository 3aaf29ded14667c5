//! Shock Simulation and Structural Risk Engine
//!
//! Pure computation over validated food-balance records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │           BalanceRecord (validated, immutable)               │
//! └──────────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼                              ▼
//!        ┌───────────────┐              ┌───────────────┐
//!        │ ShockModel    │              │ RiskScorer    │
//!        │ (shortfall)   │              │ (fragility)   │
//!        └───────┬───────┘              └───────┬───────┘
//!                │                              │
//!     ┌──────────┼──────────────┐               │
//!     ▼          ▼              ▼               │
//! ┌────────┐ ┌────────────┐ ┌────────────┐      │
//! │ rank   │ │ compare    │ │ drilldown  │◀─────┘
//! └────────┘ └────────────┘ └────────────┘
//! ```
//!
//! # Determinism Guarantees
//!
//! - No shared mutable state and no I/O; every call is referentially transparent
//! - Batches are evaluated in parallel, then ordered by explicit tie-break rules
//! - Per-record failures are reported next to the results, never silently dropped

pub mod batch;
pub mod comparison;
pub mod drilldown;
pub mod error;
pub mod ranking;
pub mod record;
pub mod scoring;
pub mod shock;


pub use batch::RecordFailure;
pub use comparison::{compare, compare_with, Comparison, ComparisonRow, DeltaOrder};
pub use drilldown::{drilldown, drilldown_with, CommodityProfile, Drilldown};
pub use error::EngineError;
pub use ranking::{rank, rank_with, RankedEntry, Ranking};
pub use record::{import_dependency, BalanceInput, BalanceRecord, RecordKey};
pub use scoring::{
    score, BandThresholds, RiskBand, RiskConfig, RiskConfigError, RiskContributions, RiskResult,
    RiskScorer, RiskWeights,
};
pub use shock::{simulate, simulate_fraction, DirectShock, ShockFraction, ShockModel, ShockResult};
