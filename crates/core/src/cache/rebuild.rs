//! Reconstruct the index from the files on disk.
//!
//! Used to recover from a corrupt or lost `index.json`. Entries whose file
//! still exists are kept as they are; files with no entry are re-adopted
//! with a fresh hash and a TTL counted from their modification time.

use super::entry::{CacheEntry, CacheIndex, check_ttl_days};
use super::handle::DocCache;
use super::hash::content_hash;
use super::index;
use super::reference::{absolute_path, reference_for_path};
use super::scan::scan_files;
use crate::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Source recorded for entries re-adopted from disk.
pub const REBUILD_SOURCE: &str = "disk-scan";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    /// The previous index could not be parsed and was discarded.
    pub discarded_corrupt_index: bool,
    pub kept: usize,
    pub adopted: Vec<String>,
    /// References dropped because their file is gone.
    pub dropped: Vec<String>,
    /// Files that no reference maps onto, left untouched.
    pub skipped: Vec<String>,
}

impl DocCache {
    /// Rebuild `index.json` from the cache directory.
    ///
    /// Statistics survive when the old index was readable; a corrupt index
    /// is replaced by a fresh one.
    ///
    /// # Errors
    ///
    /// `Error::Validation` for a TTL above [`MAX_TTL_DAYS`](super::entry::MAX_TTL_DAYS),
    /// checked before anything on disk is touched.
    pub fn rebuild_index(&self, default_ttl_days: u32) -> Result<RebuildReport, Error> {
        let default_ttl_days = check_ttl_days(default_ttl_days)?;
        let _lock = self.lock()?;
        let index_path = self.index_path();

        let (previous, discarded_corrupt_index) = match index::read(&index_path) {
            Ok(previous) => (previous.unwrap_or_default(), false),
            Err(Error::CorruptIndex { path, reason }) => {
                tracing::warn!(path = %path.display(), %reason, "discarding corrupt index during rebuild");
                (CacheIndex::default(), true)
            }
            Err(err) => return Err(err),
        };

        let mut rebuilt = CacheIndex { stats: previous.stats.clone(), ..CacheIndex::default() };
        let mut report = RebuildReport {
            discarded_corrupt_index,
            kept: 0,
            adopted: Vec::new(),
            dropped: Vec::new(),
            skipped: Vec::new(),
        };

        for entry in previous.entries.into_values() {
            if absolute_path(self.root(), &entry.path).is_file() {
                rebuilt.entries.insert(entry.reference.clone(), entry);
                report.kept += 1;
            } else {
                report.dropped.push(entry.reference);
            }
        }

        let known: std::collections::HashSet<String> = rebuilt.entries.values().map(|e| e.path.clone()).collect();
        let now = self.now();
        for file in scan_files(self.root()) {
            if known.contains(&file.relative) {
                continue;
            }
            let Some(reference) = reference_for_path(&file.relative).filter(|_| !is_stale_temp(&file.relative)) else {
                report.skipped.push(file.relative);
                continue;
            };
            let content = match std::fs::read(&file.path) {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!(path = %file.relative, error = %err, "unreadable file skipped during rebuild");
                    report.skipped.push(file.relative);
                    continue;
                }
            };
            let cached_at = modified_at(&file.path).unwrap_or(now);
            let Some(expires_at) = CacheEntry::expiry_for(cached_at, default_ttl_days) else {
                tracing::warn!(path = %file.relative, %cached_at, "modification time out of range; skipped during rebuild");
                report.skipped.push(file.relative);
                continue;
            };
            rebuilt.entries.insert(
                reference.clone(),
                CacheEntry {
                    reference: reference.clone(),
                    path: file.relative,
                    source: REBUILD_SOURCE.to_string(),
                    cached_at,
                    expires_at,
                    ttl_days: default_ttl_days,
                    size_bytes: content.len() as u64,
                    hash: content_hash(&content),
                    last_accessed: cached_at,
                },
            );
            report.adopted.push(reference);
        }

        rebuilt.recompute_totals();
        index::save(&index_path, &rebuilt)?;

        tracing::info!(
            kept = report.kept,
            adopted = report.adopted.len(),
            dropped = report.dropped.len(),
            skipped = report.skipped.len(),
            "rebuilt cache index"
        );
        Ok(report)
    }
}

/// Leftover from an interrupted atomic write: `.{name}.{random}.tmp`.
fn is_stale_temp(relative: &str) -> bool {
    let name = relative.rsplit('/').next().unwrap_or(relative);
    name.starts_with('.') && name.ends_with(".tmp")
}

fn modified_at(path: &std::path::Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Utc>::from(modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::lookup::LookupReason;
    use crate::cache::store::StoreRequest;

    #[test]
    fn test_rebuild_recovers_corrupt_index() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"alpha").unwrap();
        cache.store(&StoreRequest::new("https://docs.example.com/b", "docs.example.com", 7), b"beta").unwrap();
        std::fs::write(cache.index_path(), b"{ truncated").unwrap();

        let report = cache.rebuild_index(7).unwrap();

        assert!(report.discarded_corrupt_index);
        assert_eq!(report.kept, 0);
        assert_eq!(report.adopted, vec!["@codex/acme/a.md", "https://docs.example.com/b"]);

        let index = cache.load_index().unwrap();
        let entry = index.get("@codex/acme/a.md").unwrap();
        assert_eq!(entry.source, REBUILD_SOURCE);
        assert_eq!(entry.hash, content_hash(b"alpha"));
        assert_eq!(index.stats.total_entries, 2);
        assert_eq!(index.stats.total_size_bytes, 9);
        assert_eq!(cache.lookup("@codex/acme/a.md").unwrap().reason, LookupReason::Valid);
    }

    #[test]
    fn test_rebuild_keeps_entries_and_drops_dangling() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        let kept = cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 30), b"alpha").unwrap();
        cache.store(&StoreRequest::new("@codex/acme/gone.md", "github", 30), b"x").unwrap();
        cache.record_hit(3.0).unwrap();
        std::fs::remove_file(dir.path().join("codex/acme/gone.md")).unwrap();

        let report = cache.rebuild_index(7).unwrap();

        assert!(!report.discarded_corrupt_index);
        assert_eq!(report.kept, 1);
        assert_eq!(report.dropped, vec!["@codex/acme/gone.md"]);
        assert!(report.adopted.is_empty());

        let index = cache.load_index().unwrap();
        assert_eq!(index.get("@codex/acme/a.md"), Some(&kept));
        assert_eq!(index.stats.cache_hits, 1);
        assert_eq!(index.stats.total_entries, 1);
    }

    #[test]
    fn test_rebuild_rejects_ttl_beyond_limit() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"alpha").unwrap();
        std::fs::write(cache.index_path(), b"{ truncated").unwrap();

        assert!(matches!(cache.rebuild_index(u32::MAX), Err(Error::Validation(_))));
        assert_eq!(std::fs::read(cache.index_path()).unwrap(), b"{ truncated");
    }

    #[test]
    fn test_rebuild_replaces_index_with_out_of_range_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"alpha").unwrap();
        let raw = std::fs::read_to_string(cache.index_path()).unwrap();
        std::fs::write(cache.index_path(), raw.replace("\"ttlDays\": 7", "\"ttlDays\": 4294967295")).unwrap();
        assert_eq!(cache.lookup("@codex/acme/a.md").unwrap().reason, LookupReason::IndexMissing);

        let report = cache.rebuild_index(7).unwrap();

        assert!(report.discarded_corrupt_index);
        assert_eq!(report.adopted, vec!["@codex/acme/a.md"]);
        assert_eq!(cache.lookup("@codex/acme/a.md").unwrap().reason, LookupReason::Valid);
    }

    #[test]
    fn test_rebuild_skips_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        std::fs::write(dir.path().join(".index.json.abc.tmp"), b"{").unwrap();
        std::fs::create_dir_all(dir.path().join("codex/acme")).unwrap();
        std::fs::write(dir.path().join("codex/acme/.a.md.x1y2.tmp"), b"half").unwrap();

        let report = cache.rebuild_index(7).unwrap();

        assert_eq!(report.skipped, vec![".index.json.abc.tmp", "codex/acme/.a.md.x1y2.tmp"]);
        assert!(cache.load_index().unwrap().entries.is_empty());
    }
}
