//! Read-only aggregate views over the index.

use super::disk::{self, DiskUsage};
use super::entry::CacheIndex;
use super::handle::DocCache;
use super::index;
use crate::Error;
use crate::config::AppConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Size and count of the documents from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub source: String,
    pub count: usize,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LargestEntry {
    pub reference: String,
    pub source: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetrics {
    pub total_documents: usize,
    pub total_size_bytes: u64,
    pub fresh_count: usize,
    pub expired_count: usize,
    pub fresh_percent: f64,
    pub expired_percent: f64,
    /// `None` until at least one fetch was recorded.
    pub hit_rate_percent: Option<f64>,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub avg_cache_hit_ms: f64,
    pub avg_fetch_ms: f64,
    pub failed_fetches: u64,
    pub last_cleanup: Option<DateTime<Utc>>,
    pub by_source: Vec<SourceBreakdown>,
    pub largest: Vec<LargestEntry>,
    pub disk: Option<DiskUsage>,
    pub recommendations: Vec<String>,
}

impl CacheMetrics {
    /// Aggregate `index` as of `now`.
    pub fn from_index(
        index: &CacheIndex, now: DateTime<Utc>, disk: Option<DiskUsage>, config: &AppConfig, top_n: usize,
    ) -> Self {
        let total_documents = index.entries.len();
        let expired_count = index.expired_count(now);
        let fresh_count = total_documents - expired_count;
        let percent = |n: usize| if total_documents == 0 { 0.0 } else { n as f64 / total_documents as f64 * 100.0 };

        let mut sources: BTreeMap<&str, SourceBreakdown> = BTreeMap::new();
        for entry in index.entries.values() {
            let slot = sources.entry(entry.source.as_str()).or_insert_with(|| SourceBreakdown {
                source: entry.source.clone(),
                count: 0,
                size_bytes: 0,
            });
            slot.count += 1;
            slot.size_bytes += entry.size_bytes;
        }
        let mut by_source: Vec<SourceBreakdown> = sources.into_values().collect();
        by_source.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.source.cmp(&b.source)));

        let mut largest: Vec<LargestEntry> = index
            .entries
            .values()
            .map(|e| LargestEntry { reference: e.reference.clone(), source: e.source.clone(), size_bytes: e.size_bytes })
            .collect();
        largest.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.reference.cmp(&b.reference)));
        largest.truncate(top_n);

        let stats = &index.stats;
        let mut metrics = Self {
            total_documents,
            total_size_bytes: index.entries.values().map(|e| e.size_bytes).sum(),
            fresh_count,
            expired_count,
            fresh_percent: percent(fresh_count),
            expired_percent: percent(expired_count),
            hit_rate_percent: stats.hit_rate_percent(),
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            avg_cache_hit_ms: stats.avg_cache_hit_ms,
            avg_fetch_ms: stats.avg_fetch_ms,
            failed_fetches: stats.failed_fetches,
            last_cleanup: stats.last_cleanup,
            by_source,
            largest,
            disk,
            recommendations: Vec::new(),
        };
        metrics.recommendations = metrics.recommend(config);
        metrics
    }

    fn recommend(&self, config: &AppConfig) -> Vec<String> {
        let thresholds = &config.thresholds;
        let mut out = Vec::new();

        if self.total_documents > 0 && self.expired_percent >= thresholds.expired_ratio_percent {
            out.push(format!(
                "{:.1}% of documents are expired; clear expired entries to reclaim space",
                self.expired_percent
            ));
        }
        if let Some(rate) = self.hit_rate_percent
            && rate < thresholds.hit_rate_percent
        {
            out.push(format!(
                "Hit rate {rate:.1}% is below {:.1}%; consider a longer default TTL",
                thresholds.hit_rate_percent
            ));
        }
        if let Some(free) = self.disk.and_then(|d| d.free_percent())
            && free < thresholds.min_free_disk_percent
        {
            out.push(format!("Only {free:.1}% disk space free on the cache volume"));
        }
        if !config.compression_enabled && self.total_size_bytes > thresholds.compression_size_bytes {
            out.push(format!(
                "Cache holds {} bytes without compression; enabling compression would reduce disk usage",
                self.total_size_bytes
            ));
        }
        out
    }
}

impl DocCache {
    /// Aggregate metrics for the cache. Never writes.
    ///
    /// A missing index yields empty metrics; a corrupt one is an error.
    pub fn metrics(&self, config: &AppConfig, top_n: usize) -> Result<CacheMetrics, Error> {
        let index = index::load(&self.index_path())?;
        let disk = match disk::probe(self.root(), config.check_timeout()) {
            Ok(usage) => Some(usage),
            Err(err) => {
                tracing::debug!(error = %err, "disk usage unavailable for metrics");
                None
            }
        };
        Ok(CacheMetrics::from_index(&index, self.now(), disk, config, top_n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::tests::make_entry;
    use crate::config::Thresholds;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn sample_index() -> CacheIndex {
        let mut index = CacheIndex::default();
        let mut a = make_entry("@codex/acme/a.md", 100, t0(), 1);
        a.source = "github".into();
        let mut b = make_entry("@codex/acme/b.md", 300, t0(), 30);
        b.source = "github".into();
        let mut c = make_entry("https://docs.example.com/c", 50, t0(), 30);
        c.source = "docs.example.com".into();
        index.upsert(a);
        index.upsert(b);
        index.upsert(c);
        index.stats.cache_hits = 9;
        index.stats.cache_misses = 1;
        index
    }

    #[test]
    fn test_metrics_breakdown() {
        let now = t0() + Duration::days(2);
        let metrics = CacheMetrics::from_index(&sample_index(), now, None, &AppConfig::default(), 2);

        assert_eq!(metrics.total_documents, 3);
        assert_eq!(metrics.total_size_bytes, 450);
        assert_eq!(metrics.expired_count, 1);
        assert_eq!(metrics.fresh_count, 2);
        assert!((metrics.expired_percent - 33.333).abs() < 0.01);
        assert_eq!(metrics.hit_rate_percent, Some(90.0));

        assert_eq!(metrics.by_source[0], SourceBreakdown { source: "github".into(), count: 2, size_bytes: 400 });
        assert_eq!(metrics.by_source[1].source, "docs.example.com");

        let largest: Vec<_> = metrics.largest.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(largest, vec!["@codex/acme/b.md", "@codex/acme/a.md"]);

        assert_eq!(metrics.recommendations.len(), 1);
        assert!(metrics.recommendations[0].contains("expired"));
    }

    #[test]
    fn test_metrics_recommendations_follow_thresholds() {
        let mut index = sample_index();
        index.stats.cache_hits = 1;
        index.stats.cache_misses = 9;
        let config = AppConfig {
            thresholds: Thresholds { compression_size_bytes: 10, min_free_disk_percent: 50.0, ..Default::default() },
            ..Default::default()
        };
        let disk = Some(DiskUsage { available_bytes: 10, total_bytes: 100 });

        let metrics = CacheMetrics::from_index(&index, t0(), disk, &config, 10);

        assert_eq!(metrics.expired_count, 0);
        assert_eq!(metrics.recommendations.len(), 3, "{:?}", metrics.recommendations);
        assert!(metrics.recommendations.iter().any(|r| r.contains("Hit rate")));
        assert!(metrics.recommendations.iter().any(|r| r.contains("disk space")));
        assert!(metrics.recommendations.iter().any(|r| r.contains("compression")));

        let compressed = AppConfig { compression_enabled: true, ..config };
        let metrics = CacheMetrics::from_index(&index, t0(), disk, &compressed, 10);
        assert!(!metrics.recommendations.iter().any(|r| r.contains("compression")));
    }

    #[test]
    fn test_metrics_on_missing_index() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());

        let metrics = cache.metrics(&AppConfig::default(), 5).unwrap();
        assert_eq!(metrics.total_documents, 0);
        assert_eq!(metrics.fresh_percent, 0.0);
        assert!(metrics.hit_rate_percent.is_none());
        assert!(metrics.largest.is_empty());
        assert!(!cache.index_path().exists());
    }

    #[test]
    fn test_metrics_on_corrupt_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), b"nope").unwrap();
        let cache = DocCache::open(dir.path());

        assert!(matches!(cache.metrics(&AppConfig::default(), 5), Err(Error::CorruptIndex { .. })));
    }
}
