//! Comparison Engine
//!
//! Evaluates the same records under two shocks and reports signed deltas
//! (`B - A`, positive means scenario B is worse).
//!
//! Output order is a separate policy from the per-scenario ranking: it answers
//! "who deteriorates fastest", not "who is most exposed". See [`DeltaOrder`].

use crate::engine::batch::{evaluate, RecordFailure};
use crate::engine::error::EngineError;
use crate::engine::ranking::identity_order;
use crate::engine::record::BalanceRecord;
use crate::engine::shock::{DirectShock, ShockFraction, ShockModel, ShockResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// How comparison rows are ordered. Ties always fall back to country, commodity, year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaOrder {
    /// `|delta_abs|` descending, then `|delta_pct|` descending.
    #[default]
    Magnitude,
    /// Signed `delta_abs` descending, then signed `delta_pct` descending.
    Signed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonRow<'a> {
    pub record: &'a BalanceRecord,
    pub shock_a: ShockResult,
    pub shock_b: ShockResult,
    pub delta_abs: f64,
    pub delta_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison<'a> {
    pub shock_a: f64,
    pub shock_b: f64,
    pub order: DeltaOrder,
    pub rows: Vec<ComparisonRow<'a>>,
    pub failures: Vec<RecordFailure>,
}

/// Compare `shock_a` against `shock_b` over `records`, ordered by [`DeltaOrder::Magnitude`].
pub fn compare(
    records: &[BalanceRecord],
    shock_a: f64,
    shock_b: f64,
) -> Result<Comparison<'_>, EngineError> {
    compare_with(&DirectShock, records, shock_a, shock_b, DeltaOrder::default())
}

pub fn compare_with<'a, M>(
    model: &M,
    records: &'a [BalanceRecord],
    shock_a: f64,
    shock_b: f64,
    order: DeltaOrder,
) -> Result<Comparison<'a>, EngineError>
where
    M: ShockModel + ?Sized,
{
    let a = ShockFraction::new(shock_a)?;
    let b = ShockFraction::new(shock_b)?;
    if a == b {
        return Err(EngineError::InvalidComparison { shock: a.value() });
    }

    let outcome = evaluate("compare", records, |record| {
        Ok((model.shock(record, a)?, model.shock(record, b)?))
    });

    let mut rows: Vec<ComparisonRow<'a>> = outcome
        .evaluated
        .into_iter()
        .map(|(record, (result_a, result_b))| ComparisonRow {
            record,
            delta_abs: result_b.shortfall_abs - result_a.shortfall_abs,
            delta_pct: result_b.shortfall_pct - result_a.shortfall_pct,
            shock_a: result_a,
            shock_b: result_b,
        })
        .collect();
    rows.sort_by(|x, y| delta_order(order, x, y));

    debug!(
        shock_a = a.value(),
        shock_b = b.value(),
        rows = rows.len(),
        failed = outcome.failures.len(),
        "compared scenarios"
    );

    Ok(Comparison {
        shock_a: a.value(),
        shock_b: b.value(),
        order,
        rows,
        failures: outcome.failures,
    })
}

fn delta_order(order: DeltaOrder, x: &ComparisonRow<'_>, y: &ComparisonRow<'_>) -> Ordering {
    let primary = match order {
        DeltaOrder::Magnitude => y
            .delta_abs
            .abs()
            .total_cmp(&x.delta_abs.abs())
            .then_with(|| y.delta_pct.abs().total_cmp(&x.delta_pct.abs())),
        DeltaOrder::Signed => y
            .delta_abs
            .total_cmp(&x.delta_abs)
            .then_with(|| y.delta_pct.total_cmp(&x.delta_pct)),
    };
    primary.then_with(|| identity_order(x.record, y.record))
}
