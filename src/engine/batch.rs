//! Batch evaluation shared by the ranking, comparison and drilldown engines.
//!
//! Records are evaluated independently in parallel. A record that fails
//! validation is reported as a [`RecordFailure`] and never aborts the batch.

use crate::engine::error::EngineError;
use crate::engine::record::{BalanceRecord, RecordKey};
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

/// A record excluded from a batch result, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordFailure {
    #[serde(flatten)]
    pub key: RecordKey,
    pub error: EngineError,
}

/// Successful evaluations in input order, plus failures sorted by record key.
pub(crate) struct BatchOutcome<'a, T> {
    pub evaluated: Vec<(&'a BalanceRecord, T)>,
    pub failures: Vec<RecordFailure>,
}

pub(crate) fn evaluate<'a, I, T, F>(operation: &'static str, records: I, f: F) -> BatchOutcome<'a, T>
where
    I: IntoParallelIterator<Item = &'a BalanceRecord>,
    T: Send,
    F: Fn(&'a BalanceRecord) -> Result<T, EngineError> + Sync + Send,
{
    let outcomes: Vec<(&'a BalanceRecord, Result<T, EngineError>)> = records
        .into_par_iter()
        .map(|record| (record, f(record)))
        .collect();
    let total = outcomes.len();

    let mut evaluated = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for (record, outcome) in outcomes {
        match outcome {
            Ok(value) => evaluated.push((record, value)),
            Err(error) => failures.push(RecordFailure {
                key: record.key(),
                error,
            }),
        }
    }
    failures.sort_by(|a, b| a.key.cmp(&b.key));

    if !failures.is_empty() {
        warn!(
            operation,
            failed = failures.len(),
            total,
            "records excluded from batch"
        );
    }

    BatchOutcome {
        evaluated,
        failures,
    }
}
