//! Index data model: entries and aggregate statistics.

use crate::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema version written to new index files.
pub const INDEX_VERSION: &str = "1.0.0";

/// Longest TTL accepted for new entries (ten years).
pub const MAX_TTL_DAYS: u32 = 3650;

/// Reject TTLs above [`MAX_TTL_DAYS`].
pub fn check_ttl_days(ttl_days: u32) -> Result<u32, Error> {
    if ttl_days > MAX_TTL_DAYS {
        return Err(Error::Validation(format!("ttl_days must not exceed {MAX_TTL_DAYS}, got {ttl_days}")));
    }
    Ok(ttl_days)
}

/// One cached document.
///
/// `expires_at` is derived from `cached_at + ttl_days` and persisted for fast
/// lookups; [`CacheIndex::normalize`] keeps the two in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub reference: String,
    /// Location of the cached file relative to the cache root, `/`-separated.
    pub path: String,
    pub source: String,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ttl_days: u32,
    pub size_bytes: u64,
    pub hash: String,
    /// Set when the entry is created or replaced; lookups do not touch it.
    pub last_accessed: DateTime<Utc>,
}

impl CacheEntry {
    /// `cached_at + ttl_days`, or `None` past the representable date range.
    pub fn expiry_for(cached_at: DateTime<Utc>, ttl_days: u32) -> Option<DateTime<Utc>> {
        Duration::try_days(i64::from(ttl_days)).and_then(|ttl| cached_at.checked_add_signed(ttl))
    }

    /// Fresh while `now < expires_at`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Strictly past its expiry; used by the `expired` clear scope.
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// Aggregate counters persisted alongside the entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_size_bytes: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_cache_hit_ms: f64,
    pub avg_fetch_ms: f64,
    pub failed_fetches: u64,
    pub last_cleanup: Option<DateTime<Utc>>,
}

impl CacheStats {
    /// `hits / (hits + misses)` as a percentage, if any fetch was recorded.
    pub fn hit_rate_percent(&self) -> Option<f64> {
        let total = self.cache_hits + self.cache_misses;
        (total > 0).then(|| self.cache_hits as f64 / total as f64 * 100.0)
    }

    pub fn record_hit(&mut self, elapsed_ms: f64) {
        self.cache_hits += 1;
        self.avg_cache_hit_ms = running_mean(self.avg_cache_hit_ms, self.cache_hits, elapsed_ms);
    }

    pub fn record_miss(&mut self, fetch_ms: f64) {
        self.cache_misses += 1;
        self.avg_fetch_ms = running_mean(self.avg_fetch_ms, self.cache_misses, fetch_ms);
    }

    pub fn record_failed_fetch(&mut self) {
        self.failed_fetches += 1;
    }
}

fn running_mean(previous: f64, count: u64, sample: f64) -> f64 {
    if count <= 1 {
        return sample;
    }
    previous + (sample - previous) / count as f64
}

/// The authoritative record of every cached document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CacheIndex {
    pub version: String,
    /// Keyed by reference, so a reference can never appear twice.
    #[serde(default)]
    pub entries: BTreeMap<String, CacheEntry>,
    #[serde(default)]
    pub stats: CacheStats,
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self { version: INDEX_VERSION.to_string(), entries: BTreeMap::new(), stats: CacheStats::default() }
    }
}

impl CacheIndex {
    /// Insert an entry, replacing any existing entry for the same reference.
    ///
    /// Distinct references can normalize to one file (`@https/x` and
    /// `https://x`); an entry for another reference at the same path no
    /// longer describes the file and is dropped.
    ///
    /// Returns the replaced entry.
    pub fn upsert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        self.entries
            .retain(|reference, existing| *reference == entry.reference || existing.path != entry.path);
        let previous = self.entries.insert(entry.reference.clone(), entry);
        self.recompute_totals();
        previous
    }

    pub fn remove(&mut self, reference: &str) -> Option<CacheEntry> {
        let removed = self.entries.remove(reference);
        self.recompute_totals();
        removed
    }

    pub fn get(&self, reference: &str) -> Option<&CacheEntry> {
        self.entries.get(reference)
    }

    pub fn recompute_totals(&mut self) {
        self.stats.total_entries = self.entries.len() as u64;
        self.stats.total_size_bytes = self.entries.values().map(|e| e.size_bytes).sum();
    }

    /// Re-derive every `expires_at` and the entry/size totals.
    ///
    /// Returns the number of entries whose persisted expiry had drifted, or
    /// a description of the first entry whose expiry cannot be represented.
    pub fn normalize(&mut self) -> Result<usize, String> {
        let mut drifted = 0;
        for (key, entry) in &mut self.entries {
            let expected = CacheEntry::expiry_for(entry.cached_at, entry.ttl_days).ok_or_else(|| {
                format!("entry {key}: ttlDays {} from cachedAt {} is out of range", entry.ttl_days, entry.cached_at)
            })?;
            if entry.expires_at != expected {
                drifted += 1;
                entry.expires_at = expected;
            }
            if entry.reference != *key {
                drifted += 1;
                entry.reference.clone_from(key);
            }
        }
        self.recompute_totals();
        Ok(drifted)
    }

    pub fn expired_count(&self, now: DateTime<Utc>) -> usize {
        self.entries.values().filter(|e| !e.is_fresh(now)).count()
    }
}
