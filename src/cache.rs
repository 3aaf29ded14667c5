//! Shock Result Cache
//!
//! Memoizes shock results keyed by record identity, the figures the shock
//! reads (imports and consumption) and the shock fraction. The cache sits
//! outside the engine and implements the same [`ShockModel`] seam as
//! [`DirectShock`], so any batch engine can run through it unchanged.
//!
//! Because the engine is referentially transparent and the key covers every
//! input of [`simulate_fraction`](crate::engine::simulate_fraction), a cached
//! result is always identical to a freshly computed one. Two records sharing a
//! name but not their balances never share an entry.
//!
//! Warmed shocks can be written to and read back from JSON snapshots, one file
//! per shock (`importdrop{percent}.json`).

use crate::engine::{
    BalanceRecord, DirectShock, EngineError, RecordKey, ShockFraction, ShockModel, ShockResult,
};
use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    record: RecordKey,
    imports_bits: u64,
    consumption_bits: u64,
    shock_bits: u64,
}

impl CacheKey {
    fn new(record: &BalanceRecord, shock: ShockFraction) -> Self {
        Self {
            record: record.key(),
            imports_bits: record.imports().to_bits(),
            consumption_bits: record.consumption().to_bits(),
            shock_bits: shock.bits(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// One cached result as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SnapshotEntry {
    record: RecordKey,
    imports: f64,
    consumption: f64,
    result: ShockResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Snapshot {
    shock_fraction: ShockFraction,
    entries: Vec<SnapshotEntry>,
}

/// Snapshot file for `shock` under `dir`.
pub fn snapshot_path(dir: impl AsRef<Path>, shock: ShockFraction) -> PathBuf {
    dir.as_ref()
        .join(format!("importdrop{}.json", shock.percent_key()))
}

/// Thread-safe memo of shock results.
#[derive(Debug, Default)]
pub struct ShockCache {
    entries: RwLock<HashMap<CacheKey, ShockResult>>,
    shocks: RwLock<BTreeSet<u64>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ShockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for `record` under `shock`, computing and storing it on a miss.
    pub fn get_or_compute(
        &self,
        record: &BalanceRecord,
        shock: ShockFraction,
    ) -> Result<ShockResult, EngineError> {
        let key = CacheKey::new(record, shock);
        if let Some(result) = self.entries.read().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(*result);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = DirectShock.shock(record, shock)?;
        self.entries.write().insert(key, result);
        self.shocks.write().insert(shock.bits());
        Ok(result)
    }

    /// Warm the cache for every record under every shock. Returns failures per record.
    pub fn precompute(
        &self,
        records: &[BalanceRecord],
        shocks: &[ShockFraction],
    ) -> Vec<(RecordKey, EngineError)> {
        let mut failures: Vec<(RecordKey, EngineError)> = shocks
            .iter()
            .flat_map(|&shock| {
                records
                    .par_iter()
                    .filter_map(|record| {
                        self.get_or_compute(record, shock)
                            .err()
                            .map(|e| (record.key(), e))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        failures.dedup_by(|a, b| a.0 == b.0);

        {
            let mut warmed = self.shocks.write();
            warmed.extend(shocks.iter().map(|s| s.bits()));
        }

        info!(
            records = records.len(),
            shocks = shocks.len(),
            entries = self.len(),
            failed = failures.len(),
            "precomputed shock results"
        );
        failures
    }

    /// Write every cached result for `shock` to `dir`. Returns the file written.
    pub fn save_snapshot(&self, dir: impl AsRef<Path>, shock: ShockFraction) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let mut entries: Vec<SnapshotEntry> = self
            .entries
            .read()
            .iter()
            .filter(|(key, _)| key.shock_bits == shock.bits())
            .map(|(key, result)| SnapshotEntry {
                record: key.record.clone(),
                imports: f64::from_bits(key.imports_bits),
                consumption: f64::from_bits(key.consumption_bits),
                result: *result,
            })
            .collect();
        entries.sort_by(|a, b| a.record.cmp(&b.record));

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache dir: {:?}", dir))?;
        let path = snapshot_path(dir, shock);
        let snapshot = Snapshot {
            shock_fraction: shock,
            entries,
        };
        std::fs::write(&path, serde_json::to_string(&snapshot)?)
            .with_context(|| format!("Failed to write snapshot: {:?}", path))?;

        info!(path = %path.display(), entries = snapshot.entries.len(), "saved shock snapshot");
        Ok(path)
    }

    /// Load the snapshot for `shock` from `dir`. Returns the number of entries read.
    pub fn load_snapshot(&self, dir: impl AsRef<Path>, shock: ShockFraction) -> Result<usize> {
        let path = snapshot_path(dir, shock);
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
        let snapshot: Snapshot = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse snapshot: {:?}", path))?;
        if snapshot.shock_fraction != shock {
            bail!(
                "Snapshot {:?} holds shock {}, expected {}",
                path,
                snapshot.shock_fraction,
                shock
            );
        }

        let count = snapshot.entries.len();
        {
            let mut entries = self.entries.write();
            for entry in snapshot.entries {
                entries.insert(
                    CacheKey {
                        record: entry.record,
                        imports_bits: entry.imports.to_bits(),
                        consumption_bits: entry.consumption.to_bits(),
                        shock_bits: shock.bits(),
                    },
                    entry.result,
                );
            }
        }
        self.shocks.write().insert(shock.bits());

        info!(path = %path.display(), entries = count, "loaded shock snapshot");
        Ok(count)
    }

    /// Shock magnitudes with cached results, ascending.
    pub fn cached_shocks(&self) -> Vec<f64> {
        let mut shocks: Vec<f64> = self
            .shocks
            .read()
            .iter()
            .map(|&bits| f64::from_bits(bits))
            .collect();
        shocks.sort_by(f64::total_cmp);
        shocks
    }

    pub fn contains(&self, record: &BalanceRecord, shock: ShockFraction) -> bool {
        self.entries
            .read()
            .contains_key(&CacheKey::new(record, shock))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry and reset the hit/miss counters.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.shocks.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl ShockModel for ShockCache {
    fn shock(
        &self,
        record: &BalanceRecord,
        shock: ShockFraction,
    ) -> Result<ShockResult, EngineError> {
        self.get_or_compute(record, shock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{rank, rank_with, simulate_fraction, BalanceInput};

    fn records() -> Vec<BalanceRecord> {
        ["Egypt", "Malta", "Japan"]
            .iter()
            .enumerate()
            .map(|(i, c)| {
                BalanceRecord::from_input(BalanceInput::new(*c, "Wheat", i as f64, 5.0, 0.0))
                    .unwrap()
            })
            .collect()
    }

    fn shock(value: f64) -> ShockFraction {
        ShockFraction::new(value).unwrap()
    }

    #[test]
    fn test_hit_after_miss() {
        let cache = ShockCache::new();
        let records = records();
        let first = cache.get_or_compute(&records[0], shock(0.2)).unwrap();
        let second = cache.get_or_compute(&records[0], shock(0.2)).unwrap();
        assert_eq!(first, second);
        let stats = cache.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses), (1, 1, 1));
    }

    #[test]
    fn test_precompute_lists_shocks_sorted() {
        let cache = ShockCache::new();
        let records = records();
        let failures = cache.precompute(&records, &[shock(0.5), shock(0.2), shock(0.35)]);
        assert!(failures.is_empty());
        assert_eq!(cache.len(), 9);
        assert_eq!(cache.cached_shocks(), vec![0.2, 0.35, 0.5]);
        assert!(cache.contains(&records[2], shock(0.35)));
        assert!(!cache.contains(&records[2], shock(0.1)));
    }

    #[test]
    fn test_cached_ranking_matches_direct() {
        let cache = ShockCache::new();
        let records = records();
        cache.precompute(&records, &[shock(0.35)]);

        let direct = rank(&records, 0.35, None).unwrap();
        let cached = rank_with(&cache, &records, 0.35, None).unwrap();
        let direct_results: Vec<ShockResult> = direct.entries.iter().map(|e| e.shock).collect();
        let cached_results: Vec<ShockResult> = cached.entries.iter().map(|e| e.shock).collect();
        assert_eq!(direct_results, cached_results);
        assert_eq!(cache.stats().hits, 3);
    }

    #[test]
    fn test_same_name_different_figures_not_shared() {
        let cache = ShockCache::new();
        let large = BalanceRecord::from_input(BalanceInput::new("Egypt", "Wheat", 9.0, 12.0, 0.0))
            .unwrap();
        let small = BalanceRecord::from_input(BalanceInput::new("Egypt", "Wheat", 9.0, 2.0, 0.0))
            .unwrap();
        assert_eq!(large.key(), small.key());

        let first = vec![large];
        let second = vec![small];
        let cached_first = rank_with(&cache, &first, 0.5, None).unwrap();
        let cached_second = rank_with(&cache, &second, 0.5, None).unwrap();
        assert_eq!(cached_first.entries[0].shock.shortfall_abs, 6.0);
        assert_eq!(
            cached_second.entries[0].shock,
            simulate_fraction(&second[0], shock(0.5)).unwrap()
        );
        assert!(cached_second.entries[0].shock.shortfall_abs <= second[0].imports());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn test_precompute_reports_bad_records_once() {
        let cache = ShockCache::new();
        let mut records = records();
        records[1].consumption = -1.0;
        let failures = cache.precompute(&records, &[shock(0.2), shock(0.5)]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.country, "Malta");
    }

    #[test]
    fn test_clear_resets_entries_and_counters() {
        let cache = ShockCache::new();
        let records = records();
        cache.precompute(&records, &[shock(0.2)]);
        cache.get_or_compute(&records[0], shock(0.2)).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.cached_shocks().is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_snapshot_round_trip_serves_hits() {
        let dir = tempfile::tempdir().unwrap();
        let records = records();

        let warm = ShockCache::new();
        warm.precompute(&records, &[shock(0.2), shock(0.5)]);
        let path = warm.save_snapshot(dir.path(), shock(0.5)).unwrap();
        assert!(path.ends_with("importdrop50.json"));

        let cold = ShockCache::new();
        assert_eq!(cold.load_snapshot(dir.path(), shock(0.5)).unwrap(), 3);
        assert_eq!(cold.cached_shocks(), vec![0.5]);

        let cached = rank_with(&cold, &records, 0.5, None).unwrap();
        let direct = rank(&records, 0.5, None).unwrap();
        let cached_results: Vec<ShockResult> = cached.entries.iter().map(|e| e.shock).collect();
        let direct_results: Vec<ShockResult> = direct.entries.iter().map(|e| e.shock).collect();
        assert_eq!(cached_results, direct_results);
        assert_eq!(cold.stats().hits, 3);
        assert_eq!(cold.stats().misses, 0);
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ShockCache::new()
            .load_snapshot(dir.path(), shock(0.35))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read snapshot"));
    }
}
