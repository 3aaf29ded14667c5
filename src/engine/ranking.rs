//! Ranking Engine
//!
//! Orders records by exposure to a single shock. The order is total:
//!
//! 1. `shortfall_abs` descending
//! 2. `shortfall_pct` descending
//! 3. `country` ascending
//! 4. `commodity` ascending, then `year` ascending
//!
//! so permuting the input never changes the output.

use crate::engine::batch::{evaluate, RecordFailure};
use crate::engine::error::EngineError;
use crate::engine::record::BalanceRecord;
use crate::engine::shock::{DirectShock, ShockFraction, ShockModel, ShockResult};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry<'a> {
    /// 1-based position.
    pub rank: usize,
    pub record: &'a BalanceRecord,
    pub shock: ShockResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ranking<'a> {
    pub shock_fraction: f64,
    /// Records that produced a result, before truncation.
    pub evaluated: usize,
    pub entries: Vec<RankedEntry<'a>>,
    pub failures: Vec<RecordFailure>,
}

/// Rank `records` by shortfall under `shock_fraction`, keeping the first `top_n`.
pub fn rank(
    records: &[BalanceRecord],
    shock_fraction: f64,
    top_n: Option<usize>,
) -> Result<Ranking<'_>, EngineError> {
    rank_with(&DirectShock, records, shock_fraction, top_n)
}

/// [`rank`] with results drawn from `model`.
pub fn rank_with<'a, M>(
    model: &M,
    records: &'a [BalanceRecord],
    shock_fraction: f64,
    top_n: Option<usize>,
) -> Result<Ranking<'a>, EngineError>
where
    M: ShockModel + ?Sized,
{
    let shock = ShockFraction::new(shock_fraction)?;
    let outcome = evaluate("rank", records, |record| model.shock(record, shock));

    let mut evaluated = outcome.evaluated;
    evaluated.sort_by(|a, b| exposure_order((a.0, &a.1), (b.0, &b.1)));
    let total = evaluated.len();
    if let Some(n) = top_n {
        evaluated.truncate(n);
    }

    debug!(
        shock = shock.value(),
        total,
        kept = evaluated.len(),
        failed = outcome.failures.len(),
        "ranked records"
    );

    Ok(Ranking {
        shock_fraction: shock.value(),
        evaluated: total,
        entries: evaluated
            .into_iter()
            .enumerate()
            .map(|(i, (record, shock))| RankedEntry {
                rank: i + 1,
                record,
                shock,
            })
            .collect(),
        failures: outcome.failures,
    })
}

pub(crate) fn exposure_order(
    a: (&BalanceRecord, &ShockResult),
    b: (&BalanceRecord, &ShockResult),
) -> Ordering {
    b.1.shortfall_abs
        .total_cmp(&a.1.shortfall_abs)
        .then_with(|| b.1.shortfall_pct.total_cmp(&a.1.shortfall_pct))
        .then_with(|| identity_order(a.0, b.0))
}

/// Country, then commodity, then year.
pub(crate) fn identity_order(a: &BalanceRecord, b: &BalanceRecord) -> Ordering {
    a.country()
        .cmp(b.country())
        .then_with(|| a.commodity().cmp(b.commodity()))
        .then_with(|| a.year().cmp(&b.year()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::record::BalanceInput;

    fn record(country: &str, commodity: &str, production: f64, imports: f64) -> BalanceRecord {
        BalanceRecord::from_input(BalanceInput::new(country, commodity, production, imports, 0.0))
            .unwrap()
    }

    fn sample() -> Vec<BalanceRecord> {
        vec![
            record("Malta", "Wheat", 0.0, 0.4),
            record("Egypt", "Wheat", 9.0, 12.0),
            record("Japan", "Maize", 0.0, 15.14),
            record("France", "Wheat", 35.0, 0.5),
            record("Nigeria", "Rice", 8.0, 2.0),
        ]
    }

    fn order(ranking: &Ranking<'_>) -> Vec<String> {
        ranking
            .entries
            .iter()
            .map(|e| format!("{}/{}", e.record.country(), e.record.commodity()))
            .collect()
    }

    #[test]
    fn test_sorted_by_absolute_shortfall() {
        let records = sample();
        let ranking = rank(&records, 0.35, None).unwrap();
        assert_eq!(
            order(&ranking),
            vec![
                "Japan/Maize",
                "Egypt/Wheat",
                "Nigeria/Rice",
                "France/Wheat",
                "Malta/Wheat"
            ]
        );
        assert_eq!(ranking.entries[0].rank, 1);
        assert_eq!(ranking.evaluated, 5);
    }

    #[test]
    fn test_top_n_truncates() {
        let records = sample();
        let ranking = rank(&records, 0.2, Some(2)).unwrap();
        assert_eq!(ranking.entries.len(), 2);
        assert_eq!(ranking.evaluated, 5);

        let ranking = rank(&records, 0.2, Some(50)).unwrap();
        assert_eq!(ranking.entries.len(), 5);
    }

    #[test]
    fn test_ties_break_on_pct_then_country() {
        let records = vec![
            // equal shortfall_abs, higher pct first
            record("Zambia", "Maize", 0.0, 2.0),
            record("Austria", "Maize", 8.0, 2.0),
            // identical balances, country ascending
            record("Chile", "Wheat", 8.0, 2.0),
        ];
        let ranking = rank(&records, 0.5, None).unwrap();
        assert_eq!(
            order(&ranking),
            vec!["Zambia/Maize", "Austria/Maize", "Chile/Wheat"]
        );
    }

    #[test]
    fn test_invalid_shock_fails_whole_call() {
        let records = sample();
        let err = rank(&records, 35.0, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidShockMagnitude { .. }));
    }

    #[test]
    fn test_bad_record_is_reported_not_fatal() {
        let mut records = sample();
        records[1].consumption = -2.0;
        let ranking = rank(&records, 0.35, None).unwrap();
        assert_eq!(ranking.entries.len(), 4);
        assert_eq!(ranking.failures.len(), 1);
        assert_eq!(ranking.failures[0].key.country, "Egypt");
    }

    #[test]
    fn test_empty_input() {
        let ranking = rank(&[], 0.2, Some(10)).unwrap();
        assert!(ranking.entries.is_empty());
        assert!(ranking.failures.is_empty());
    }
}
