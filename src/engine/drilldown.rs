//! Country Aggregator
//!
//! Lists every commodity of one country with its shock and risk results,
//! most fragile commodity first (`risk_score` descending, then commodity name).

use crate::engine::batch::{evaluate, RecordFailure};
use crate::engine::error::EngineError;
use crate::engine::ranking::identity_order;
use crate::engine::record::BalanceRecord;
use crate::engine::scoring::{RiskResult, RiskScorer};
use crate::engine::shock::{DirectShock, ShockFraction, ShockModel, ShockResult};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct CommodityProfile<'a> {
    pub commodity: &'a str,
    pub record: &'a BalanceRecord,
    pub shock: ShockResult,
    pub risk: RiskResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct Drilldown<'a> {
    /// Country name as stored in the records.
    pub country: &'a str,
    pub shock_fraction: f64,
    pub commodities: Vec<CommodityProfile<'a>>,
    pub failures: Vec<RecordFailure>,
}

/// Drill into `country` under `shock_fraction` using the default risk configuration.
pub fn drilldown<'a>(
    records: &'a [BalanceRecord],
    country: &str,
    shock_fraction: f64,
) -> Result<Drilldown<'a>, EngineError> {
    drilldown_with(
        &DirectShock,
        &RiskScorer::default(),
        records,
        country,
        shock_fraction,
    )
}

pub fn drilldown_with<'a, M>(
    model: &M,
    scorer: &RiskScorer,
    records: &'a [BalanceRecord],
    country: &str,
    shock_fraction: f64,
) -> Result<Drilldown<'a>, EngineError>
where
    M: ShockModel + ?Sized,
{
    let shock = ShockFraction::new(shock_fraction)?;

    let matching: Vec<&'a BalanceRecord> = records
        .iter()
        .filter(|r| r.matches_country(country))
        .collect();
    let Some(first) = matching.first().copied() else {
        return Err(EngineError::CountryNotFound {
            country: country.trim().to_string(),
        });
    };

    let outcome = evaluate("drilldown", matching, |record| {
        Ok((model.shock(record, shock)?, scorer.score(record)?))
    });

    let mut commodities: Vec<CommodityProfile<'a>> = outcome
        .evaluated
        .into_iter()
        .map(|(record, (shock, risk))| CommodityProfile {
            commodity: record.commodity(),
            record,
            shock,
            risk,
        })
        .collect();
    commodities.sort_by(|a, b| {
        b.risk
            .risk_score
            .total_cmp(&a.risk.risk_score)
            .then_with(|| identity_order(a.record, b.record))
    });

    debug!(
        country = first.country(),
        commodities = commodities.len(),
        failed = outcome.failures.len(),
        "country drilldown"
    );

    Ok(Drilldown {
        country: first.country(),
        shock_fraction: shock.value(),
        commodities,
        failures: outcome.failures,
    })
}
