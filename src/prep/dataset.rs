//! Dataset preparation.
//!
//! Turns cleaned upstream rows into the validated record collection the
//! engine consumes:
//!
//! 1. keep only the latest year per (country, commodity)
//! 2. validate each row through [`BalanceRecord::from_input`]
//! 3. keep rejected rows with their reasons instead of aborting

use crate::engine::{BalanceInput, BalanceRecord, EngineError};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// An input row that failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub country: String,
    pub commodity: String,
    pub year: Option<i32>,
    pub error: EngineError,
}

/// Validated records for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordSet {
    pub records: Vec<BalanceRecord>,
    pub rejected: Vec<RowRejection>,
    /// Rows dropped because a later year exists for the same pair.
    pub superseded: usize,
}

impl RecordSet {
    /// Build from upstream rows, keeping the latest year per (country, commodity).
    pub fn from_rows(rows: Vec<BalanceInput>) -> Self {
        let total = rows.len();
        let latest = latest_per_pair(rows);
        let superseded = total - latest.len();

        let mut records = Vec::with_capacity(latest.len());
        let mut rejected = Vec::new();
        for row in latest {
            let (country, commodity, year) = (row.country.clone(), row.commodity.clone(), row.year);
            match BalanceRecord::from_input(row) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(%country, %commodity, %error, "rejected balance row");
                    rejected.push(RowRejection {
                        country,
                        commodity,
                        year,
                        error,
                    });
                }
            }
        }

        debug!(
            total,
            accepted = records.len(),
            rejected = rejected.len(),
            superseded,
            "prepared record set"
        );

        Self {
            records,
            rejected,
            superseded,
        }
    }

    /// Load a JSON array of rows from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {:?}", path))?;
        let set = Self::from_json(&contents)
            .with_context(|| format!("Failed to parse dataset: {:?}", path))?;
        info!(
            path = %path.display(),
            records = set.records.len(),
            rejected = set.rejected.len(),
            "loaded dataset"
        );
        Ok(set)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let rows: Vec<BalanceInput> = serde_json::from_str(contents)?;
        Ok(Self::from_rows(rows))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Latest row per (country, commodity), in first-seen order of the pair.
///
/// Rows without a year lose to any dated row; among equal years the last row wins.
fn latest_per_pair(rows: Vec<BalanceInput>) -> Vec<BalanceInput> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut latest: Vec<BalanceInput> = Vec::new();

    for row in rows {
        let key = (row.country.clone(), row.commodity.clone());
        match index.get(&key) {
            Some(&slot) => {
                if row.year >= latest[slot].year {
                    latest[slot] = row;
                }
            }
            None => {
                index.insert(key, latest.len());
                latest.push(row);
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(country: &str, commodity: &str, year: i32, imports: f64) -> BalanceInput {
        BalanceInput::new(country, commodity, 1.0, imports, 0.0).with_year(year)
    }

    #[test]
    fn test_keeps_latest_year() {
        let set = RecordSet::from_rows(vec![
            row("Egypt", "Wheat", 2021, 10.0),
            row("Egypt", "Wheat", 2023, 12.0),
            row("Egypt", "Wheat", 2022, 11.0),
            row("Egypt", "Maize (corn)", 2020, 9.0),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.superseded, 2);
        assert_eq!(set.records[0].year(), Some(2023));
        assert_eq!(set.records[0].imports(), 12.0);
        assert_eq!(set.records[1].commodity(), "Maize (corn)");
    }

    #[test]
    fn test_undated_rows_lose_to_dated() {
        let undated = BalanceInput::new("Peru", "Rice", 1.0, 5.0, 0.0);
        let set = RecordSet::from_rows(vec![row("Peru", "Rice", 2019, 3.0), undated]);
        assert_eq!(set.records[0].imports(), 3.0);
    }

    #[test]
    fn test_invalid_rows_are_collected() {
        let set = RecordSet::from_rows(vec![
            row("Egypt", "Wheat", 2023, 12.0),
            BalanceInput::new("Hub", "Wheat", 1.0, 1.0, 9.0).with_year(2023),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rejected.len(), 1);
        assert_eq!(set.rejected[0].country, "Hub");
        assert!(matches!(
            set.rejected[0].error,
            EngineError::InvalidRecord { .. }
        ));
    }

    #[test]
    fn test_from_json_with_upstream_columns() {
        let json = r#"[
            {"country": "Malta", "commodity": "Wheat", "year": 2022,
             "production_qty": 0.0, "import_qty": 0.4, "export_qty": 0.0,
             "import_vol_norm": 0.6, "prod_vol_norm": 0.0}
        ]"#;
        let set = RecordSet::from_json(json).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.records[0].import_dependency(), 1.0);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        assert!(RecordSet::from_json("{not json").is_err());
    }
}
