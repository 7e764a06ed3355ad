//! Health diagnostics: cross-check the index against the filesystem and
//! evaluate the configured thresholds.
//!
//! Degraded conditions never fail the call; they are reported per check with
//! a severity and a recommendation. Only an unexpected error reading the
//! cache root itself aborts the run.

use super::atomic::remove_file_if_exists;
use super::disk::{self, DiskProbeError};
use super::entry::CacheIndex;
use super::handle::DocCache;
use super::index;
use super::reference::absolute_path;
use super::scan::{ScannedFile, scan_files};
use crate::Error;
use crate::config::AppConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::ErrorKind;

/// Groups of checks a caller can select.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckCategory {
    Cache,
    Config,
    Performance,
    Storage,
    System,
}

impl CheckCategory {
    pub const ALL: [CheckCategory; 5] = [
        CheckCategory::Cache,
        CheckCategory::Config,
        CheckCategory::Performance,
        CheckCategory::Storage,
        CheckCategory::System,
    ];

    /// Parse one category name; `all` expands to every category.
    pub fn parse(name: &str) -> Result<Vec<Self>, Error> {
        Ok(match name.trim().to_ascii_lowercase().as_str() {
            "all" => Self::ALL.to_vec(),
            "cache" => vec![CheckCategory::Cache],
            "config" => vec![CheckCategory::Config],
            "performance" => vec![CheckCategory::Performance],
            "storage" => vec![CheckCategory::Storage],
            "system" => vec![CheckCategory::System],
            other => {
                return Err(Error::Validation(format!(
                    "unknown check category '{other}' (expected cache, config, performance, storage, system, or all)"
                )));
            }
        })
    }
}

/// Severity of a single check. Ordered so the maximum is the worst.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, schemars::JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warning,
    Error,
}

/// Overall verdict, usable as a process exit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Failed,
}

impl HealthStatus {
    fn from_worst(worst: CheckStatus) -> Self {
        match worst {
            CheckStatus::Pass => HealthStatus::Healthy,
            CheckStatus::Warning => HealthStatus::Degraded,
            CheckStatus::Error => HealthStatus::Failed,
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Failed => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub recommendation: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, message: impl Into<String>) -> Self {
        Self { name: name.into(), status: CheckStatus::Pass, message: message.into(), recommendation: None }
    }

    fn warning(name: &str, message: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warning,
            message: message.into(),
            recommendation: Some(recommendation.into()),
        }
    }

    fn error(name: &str, message: impl Into<String>, recommendation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Error,
            message: message.into(),
            recommendation: Some(recommendation.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CategoryReport {
    pub category: CheckCategory,
    pub status: CheckStatus,
    pub checks: Vec<CheckResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checked_at: DateTime<Utc>,
    pub categories: Vec<CategoryReport>,
    pub recommendations: Vec<String>,
    pub fixes_applied: Vec<String>,
}

impl HealthReport {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn category(&self, category: CheckCategory) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.categories.iter().flat_map(|c| &c.checks).find(|c| c.name == name)
    }

    /// Turn a failed report into `Error::ThresholdExceeded`.
    pub fn ensure_healthy(&self) -> Result<(), Error> {
        if self.status != HealthStatus::Failed {
            return Ok(());
        }
        let failing: Vec<String> = self
            .categories
            .iter()
            .flat_map(|c| &c.checks)
            .filter(|c| c.status == CheckStatus::Error)
            .map(|c| format!("{}: {}", c.name, c.message))
            .collect();
        Err(Error::ThresholdExceeded(failing.join("; ")))
    }
}

/// Which checks to run and whether to repair what can be repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HealthOptions {
    pub categories: Vec<CheckCategory>,
    /// Remove orphaned files.
    pub fix: bool,
}

impl Default for HealthOptions {
    fn default() -> Self {
        Self { categories: CheckCategory::ALL.to_vec(), fix: false }
    }
}

impl HealthOptions {
    /// Build options from category names; an empty list means `all`.
    pub fn parse<S: AsRef<str>>(names: &[S], fix: bool) -> Result<Self, Error> {
        let mut categories = Vec::new();
        for name in names {
            categories.extend(CheckCategory::parse(name.as_ref())?);
        }
        if categories.is_empty() {
            categories = CheckCategory::ALL.to_vec();
        }
        categories.sort();
        categories.dedup();
        Ok(Self { categories, fix })
    }
}

enum IndexState {
    Missing,
    Corrupt(String),
    Unreadable(String),
    Loaded(CacheIndex),
}

impl IndexState {
    fn read(cache: &DocCache) -> Self {
        match index::read(&cache.index_path()) {
            Ok(Some(index)) => IndexState::Loaded(index),
            Ok(None) => IndexState::Missing,
            Err(Error::CorruptIndex { reason, .. }) => IndexState::Corrupt(reason),
            Err(err) => IndexState::Unreadable(err.to_string()),
        }
    }

    fn loaded(&self) -> Option<&CacheIndex> {
        match self {
            IndexState::Loaded(index) => Some(index),
            _ => None,
        }
    }
}

enum RootState {
    Missing,
    Unusable,
    Ready,
}

struct Run<'a> {
    cache: &'a DocCache,
    config: &'a AppConfig,
    fix: bool,
    fixes_applied: Vec<String>,
}

impl DocCache {
    /// Run the selected health checks.
    ///
    /// # Errors
    ///
    /// `Error::Storage` only when the cache root exists but cannot be
    /// inspected at all.
    pub fn health(&self, config: &AppConfig, options: &HealthOptions) -> Result<HealthReport, Error> {
        let root_meta = match std::fs::metadata(self.root()) {
            Ok(meta) => Some(meta),
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => return Err(Error::storage(&format!("inspect {}", self.root().display()), err)),
        };

        let mut run = Run { cache: self, config, fix: options.fix, fixes_applied: Vec::new() };
        let index_state = IndexState::read(self);

        let mut selected = options.categories.clone();
        selected.sort();
        selected.dedup();

        let mut categories = Vec::new();
        for category in selected {
            let checks = match category {
                CheckCategory::Cache => run.cache_checks(root_meta.as_ref(), &index_state),
                CheckCategory::Config => run.config_checks(),
                CheckCategory::Performance => run.performance_checks(&index_state),
                CheckCategory::Storage => run.storage_checks(&index_state),
                CheckCategory::System => run.system_checks(),
            };
            let status = checks.iter().map(|c| c.status).max().unwrap_or(CheckStatus::Pass);
            categories.push(CategoryReport { category, status, checks });
        }

        let worst = categories.iter().map(|c| c.status).max().unwrap_or(CheckStatus::Pass);
        let recommendations = categories
            .iter()
            .flat_map(|c| &c.checks)
            .filter_map(|c| c.recommendation.clone())
            .collect();

        let report = HealthReport {
            status: HealthStatus::from_worst(worst),
            checked_at: self.now(),
            categories,
            recommendations,
            fixes_applied: run.fixes_applied,
        };

        tracing::debug!(status = ?report.status, fixes = report.fixes_applied.len(), "health check finished");
        Ok(report)
    }
}

impl Run<'_> {
    fn cache_checks(&mut self, root_meta: Option<&std::fs::Metadata>, index_state: &IndexState) -> Vec<CheckResult> {
        let mut checks = Vec::new();

        let root_state = self.directory_check(root_meta, &mut checks);
        match root_state {
            RootState::Missing | RootState::Unusable => return checks,
            RootState::Ready => {}
        }

        checks.push(match index_state {
            IndexState::Loaded(index) => {
                CheckResult::pass("index", format!("index valid with {} entries", index.entries.len()))
            }
            IndexState::Missing => CheckResult::warning(
                "index",
                "cache directory exists but index.json is missing",
                "Rebuild the index from disk (rebuild) or clear the cache",
            ),
            IndexState::Corrupt(reason) => CheckResult::error(
                "index",
                format!("index.json cannot be parsed: {reason}"),
                "Rebuild the index from the files on disk (rebuild)",
            ),
            IndexState::Unreadable(reason) => CheckResult::error(
                "index",
                format!("index.json cannot be read: {reason}"),
                "Check permissions on the cache directory",
            ),
        });

        if index_state.loaded().is_none() {
            checks.push(CheckResult::pass("orphans", "skipped: no usable index to compare against"));
            return checks;
        }

        checks.push(self.orphan_check());
        if let Some(index) = index_state.loaded() {
            checks.push(self.missing_files_check(index));
        }
        checks
    }

    fn directory_check(&self, root_meta: Option<&std::fs::Metadata>, checks: &mut Vec<CheckResult>) -> RootState {
        let root = self.cache.root();
        let Some(meta) = root_meta else {
            checks.push(CheckResult::warning(
                "directory",
                format!("cache directory {} does not exist (not yet initialized)", root.display()),
                "Store a document to initialize the cache directory",
            ));
            return RootState::Missing;
        };

        if !meta.is_dir() {
            checks.push(CheckResult::error(
                "directory",
                format!("{} is not a directory", root.display()),
                "Point cache_dir at a directory",
            ));
            return RootState::Unusable;
        }

        if let Err(err) = std::fs::read_dir(root) {
            checks.push(CheckResult::error(
                "directory",
                format!("cache directory is not readable: {err}"),
                format!("Fix read permissions on {}", root.display()),
            ));
            return RootState::Unusable;
        }

        if let Err(err) = tempfile::Builder::new().prefix(".health-probe").tempfile_in(root) {
            checks.push(CheckResult::error(
                "directory",
                format!("cache directory is not writable: {err}"),
                format!("Fix write permissions on {}", root.display()),
            ));
            return RootState::Unusable;
        }

        checks.push(CheckResult::pass("directory", format!("{} is readable and writable", root.display())));
        RootState::Ready
    }

    fn orphan_check(&mut self) -> CheckResult {
        // Repair excludes writers so a store between its content write and
        // its index update is never mistaken for an orphan.
        let _lock = if self.fix {
            match self.cache.lock() {
                Ok(lock) => Some(lock),
                Err(err) => {
                    return CheckResult::warning(
                        "orphans",
                        format!("could not lock the index for repair: {err}"),
                        "Retry the health check with fix once other writers finish",
                    );
                }
            }
        } else {
            None
        };

        // Re-read under the lock; the snapshot taken before may be stale.
        let index = match index::load(&self.cache.index_path()) {
            Ok(index) => index,
            Err(err) => {
                return CheckResult::warning("orphans", format!("skipped: {err}"), "Repair the index first");
            }
        };

        let orphans = find_orphans(self.cache, &index);
        if orphans.is_empty() {
            return CheckResult::pass("orphans", "no orphaned files");
        }

        if !self.fix {
            return CheckResult::warning(
                "orphans",
                format!("{} orphaned files on disk with no index entry", orphans.len()),
                "Run the health check with fix enabled to remove orphaned files",
            );
        }

        let mut remaining = 0usize;
        for orphan in &orphans {
            match remove_file_if_exists(&orphan.path) {
                Ok(_) => self.fixes_applied.push(format!("removed orphaned file {}", orphan.relative)),
                Err(err) => {
                    remaining += 1;
                    tracing::warn!(path = %orphan.path.display(), error = %err, "failed to remove orphaned file");
                }
            }
        }

        let removed = orphans.len() - remaining;
        if remaining == 0 {
            CheckResult::pass("orphans", format!("removed {removed} orphaned files"))
        } else {
            CheckResult::warning(
                "orphans",
                format!("removed {removed} orphaned files, {remaining} could not be removed"),
                "Remove the remaining orphaned files manually",
            )
        }
    }

    fn missing_files_check(&self, index: &CacheIndex) -> CheckResult {
        let missing = index
            .entries
            .values()
            .filter(|e| !absolute_path(self.cache.root(), &e.path).is_file())
            .count();
        if missing == 0 {
            CheckResult::pass("missing_files", "every index entry has its file")
        } else {
            CheckResult::warning(
                "missing_files",
                format!("{missing} index entries point at files that no longer exist"),
                "Clear the affected entries or fetch them again",
            )
        }
    }

    fn config_checks(&self) -> Vec<CheckResult> {
        vec![match self.config.validate() {
            Ok(()) => CheckResult::pass("configuration", "configuration is valid"),
            Err(err) => CheckResult::error("configuration", err.to_string(), "Fix the configuration value reported"),
        }]
    }

    fn performance_checks(&self, index_state: &IndexState) -> Vec<CheckResult> {
        let Some(index) = index_state.loaded() else {
            return vec![CheckResult::pass("expired_ratio", "skipped: no index data")];
        };
        let thresholds = &self.config.thresholds;
        let mut checks = Vec::new();

        let total = index.entries.len();
        if total == 0 {
            checks.push(CheckResult::pass("expired_ratio", "cache is empty"));
        } else {
            let expired = index.expired_count(self.cache.now());
            let ratio = expired as f64 / total as f64 * 100.0;
            checks.push(if ratio < thresholds.expired_ratio_percent {
                CheckResult::pass("expired_ratio", format!("{expired}/{total} entries expired ({ratio:.1}%)"))
            } else {
                CheckResult::warning(
                    "expired_ratio",
                    format!(
                        "{expired}/{total} entries expired ({ratio:.1}%, threshold {:.1}%)",
                        thresholds.expired_ratio_percent
                    ),
                    format!("Clear expired entries (scope=expired) to reclaim {expired} documents"),
                )
            });
        }

        checks.push(match index.stats.hit_rate_percent() {
            None => CheckResult::pass("hit_rate", "no fetches recorded yet"),
            Some(rate) if rate < thresholds.hit_rate_percent => CheckResult::warning(
                "hit_rate",
                format!("hit rate {rate:.1}% is below {:.1}%", thresholds.hit_rate_percent),
                "Increase default_ttl_days so documents stay fresh longer",
            ),
            Some(rate) => CheckResult::pass("hit_rate", format!("hit rate {rate:.1}%")),
        });

        checks
    }

    fn storage_checks(&self, index_state: &IndexState) -> Vec<CheckResult> {
        let min_mb = self.config.thresholds.min_free_disk_mb;
        let mut checks = vec![match disk::probe(self.cache.root(), self.config.check_timeout()) {
            Ok(usage) if usage.available_mb() < min_mb => CheckResult::error(
                "disk_space",
                format!("{} MB available, below the {min_mb} MB minimum", usage.available_mb()),
                "Free disk space or clear cache entries",
            ),
            Ok(usage) => CheckResult::pass(
                "disk_space",
                format!(
                    "{} MB available ({:.1}% free)",
                    usage.available_mb(),
                    usage.free_percent().unwrap_or(0.0)
                ),
            ),
            Err(err @ DiskProbeError::TimedOut(_)) => {
                CheckResult::warning("disk_space", err.to_string(), "Check that the cache volume is responsive")
            }
            Err(err) => {
                CheckResult::warning("disk_space", err.to_string(), "Check that the cache volume is mounted")
            }
        }];

        if let Some(index) = index_state.loaded() {
            checks.push(CheckResult::pass(
                "cache_size",
                format!("{} documents, {} bytes", index.stats.total_entries, index.stats.total_size_bytes),
            ));
        }
        checks
    }

    fn system_checks(&self) -> Vec<CheckResult> {
        if self.config.required_tools.is_empty() {
            return vec![CheckResult::pass("dependencies", "no external tools required")];
        }
        self.config
            .required_tools
            .iter()
            .map(|tool| match which::which(tool) {
                Ok(path) => CheckResult::pass(&format!("tool:{tool}"), format!("found at {}", path.display())),
                Err(_) => CheckResult::error(
                    &format!("tool:{tool}"),
                    format!("{tool} not found on PATH"),
                    format!("Install {tool}"),
                ),
            })
            .collect()
    }
}

fn find_orphans(cache: &DocCache, index: &CacheIndex) -> Vec<ScannedFile> {
    let known: HashSet<&str> = index.entries.values().map(|e| e.path.as_str()).collect();
    scan_files(cache.root())
        .into_iter()
        .filter(|f| !known.contains(f.relative.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::cache::store::StoreRequest;
    use crate::config::Thresholds;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn quiet_config() -> AppConfig {
        AppConfig {
            required_tools: Vec::new(),
            thresholds: Thresholds { min_free_disk_mb: 0, ..Default::default() },
            ..Default::default()
        }
    }

    fn setup() -> (tempfile::TempDir, DocCache, Arc<ManualClock>) {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()));
        let cache = DocCache::open(dir.path()).with_clock(clock.clone());
        (dir, cache, clock)
    }

    #[test]
    fn test_healthy_cache() {
        let (_dir, cache, _clock) = setup();
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"a").unwrap();

        let report = cache.health(&quiet_config(), &HealthOptions::default()).unwrap();

        assert_eq!(report.status, HealthStatus::Healthy, "{report:#?}");
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.categories.len(), 5);
        assert!(report.recommendations.is_empty());
        assert!(report.ensure_healthy().is_ok());
    }

    #[test]
    fn test_missing_directory_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path().join("never-created"));

        let options = HealthOptions::parse(&["cache"], false).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.check("directory").unwrap().status, CheckStatus::Warning);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_file_as_cache_root_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        std::fs::write(&root, b"not a directory").unwrap();
        let cache = DocCache::open(&root);

        let report = cache.health(&quiet_config(), &HealthOptions::default()).unwrap();

        let check = report.check("directory").unwrap();
        assert_eq!(check.status, CheckStatus::Error);
        assert!(check.message.contains("is not a directory"));
        assert!(report.check("index").is_none());
        assert_eq!(report.status, HealthStatus::Failed);
        assert_eq!(report.exit_code(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_only_cache_root_fails() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, cache, _clock) = setup();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o555)).unwrap();
        // Permission bits do not bind root.
        let privileged = std::fs::write(dir.path().join("probe"), b"x").is_ok();

        let options = HealthOptions::parse(&["cache"], false).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();
        std::fs::set_permissions(dir.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            return;
        }

        let check = report.check("directory").unwrap();
        assert_eq!(check.status, CheckStatus::Error);
        assert!(check.message.contains("not writable"));
        assert_eq!(report.status, HealthStatus::Failed);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn test_missing_index_is_a_warning() {
        let (dir, cache, _clock) = setup();
        std::fs::write(dir.path().join("loose.md"), b"x").unwrap();

        let options = HealthOptions::parse(&["cache"], false).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();

        assert_eq!(report.check("index").unwrap().status, CheckStatus::Warning);
        assert_eq!(report.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_corrupt_index_fails() {
        let (dir, cache, _clock) = setup();
        std::fs::write(dir.path().join("index.json"), b"[[[").unwrap();

        let report = cache.health(&quiet_config(), &HealthOptions::default()).unwrap();

        assert_eq!(report.check("index").unwrap().status, CheckStatus::Error);
        assert_eq!(report.status, HealthStatus::Failed);
        assert_eq!(report.exit_code(), 2);
        assert!(matches!(report.ensure_healthy(), Err(Error::ThresholdExceeded(_))));
    }

    #[test]
    fn test_orphan_reported_without_fix() {
        let (dir, cache, _clock) = setup();
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"a").unwrap();
        let orphan = dir.path().join("codex/acme/orphan.md");
        std::fs::write(&orphan, b"stray").unwrap();

        let options = HealthOptions::parse(&["cache"], false).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();

        let check = report.check("orphans").unwrap();
        assert_eq!(check.status, CheckStatus::Warning);
        assert!(check.message.starts_with("1 orphaned"));
        assert!(orphan.exists());
        assert!(report.fixes_applied.is_empty());
    }

    #[test]
    fn test_orphan_removed_with_fix() {
        let (dir, cache, _clock) = setup();
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"a").unwrap();
        let orphan = dir.path().join("codex/acme/orphan.md");
        std::fs::write(&orphan, b"stray").unwrap();

        let options = HealthOptions::parse(&["cache"], true).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();

        assert!(!orphan.exists());
        assert_eq!(report.fixes_applied, vec!["removed orphaned file codex/acme/orphan.md".to_string()]);
        assert!(dir.path().join("codex/acme/a.md").exists());

        let options = HealthOptions::parse(&["cache"], false).unwrap();
        let again = cache.health(&quiet_config(), &options).unwrap();
        assert_eq!(again.check("orphans").unwrap().message, "no orphaned files");
    }

    #[test]
    fn test_missing_backing_file_is_reported() {
        let (dir, cache, _clock) = setup();
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"a").unwrap();
        std::fs::remove_file(dir.path().join("codex/acme/a.md")).unwrap();

        let options = HealthOptions::parse(&["cache"], false).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();
        assert_eq!(report.check("missing_files").unwrap().status, CheckStatus::Warning);
    }

    #[test]
    fn test_expired_ratio_threshold() {
        let (_dir, cache, clock) = setup();
        cache.store(&StoreRequest::new("@codex/acme/old.md", "github", 1), b"a").unwrap();
        cache.store(&StoreRequest::new("@codex/acme/new.md", "github", 30), b"b").unwrap();
        clock.advance(Duration::days(2));

        let options = HealthOptions::parse(&["performance"], false).unwrap();
        let report = cache.health(&quiet_config(), &options).unwrap();

        assert_eq!(report.categories.len(), 1);
        assert_eq!(report.check("expired_ratio").unwrap().status, CheckStatus::Warning);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.recommendations.len(), 1);
    }

    #[test]
    fn test_hit_rate_only_after_fetches() {
        let (_dir, cache, _clock) = setup();
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"a").unwrap();
        let options = HealthOptions::parse(&["performance"], false).unwrap();

        let report = cache.health(&quiet_config(), &options).unwrap();
        assert_eq!(report.check("hit_rate").unwrap().status, CheckStatus::Pass);

        cache.record_hit(1.0).unwrap();
        for _ in 0..3 {
            cache.record_miss(100.0).unwrap();
        }
        let report = cache.health(&quiet_config(), &options).unwrap();
        assert_eq!(report.check("hit_rate").unwrap().status, CheckStatus::Warning);
    }

    #[test]
    fn test_low_disk_space_is_an_error() {
        let (_dir, cache, _clock) = setup();
        let config = AppConfig {
            thresholds: Thresholds { min_free_disk_mb: u64::MAX, ..Default::default() },
            ..quiet_config()
        };

        let options = HealthOptions::parse(&["storage"], false).unwrap();
        let report = cache.health(&config, &options).unwrap();
        assert_eq!(report.check("disk_space").unwrap().status, CheckStatus::Error);
        assert_eq!(report.status, HealthStatus::Failed);
    }

    #[test]
    fn test_missing_tool_is_an_error() {
        let (_dir, cache, _clock) = setup();
        let config = AppConfig { required_tools: vec!["codex-cache-no-such-tool".into()], ..quiet_config() };

        let options = HealthOptions::parse(&["system"], false).unwrap();
        let report = cache.health(&config, &options).unwrap();
        assert_eq!(report.check("tool:codex-cache-no-such-tool").unwrap().status, CheckStatus::Error);
        assert_eq!(report.recommendations, vec!["Install codex-cache-no-such-tool".to_string()]);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let (_dir, cache, _clock) = setup();
        let config = AppConfig { user_agent: String::new(), ..quiet_config() };

        let options = HealthOptions::parse(&["config"], false).unwrap();
        let report = cache.health(&config, &options).unwrap();
        assert_eq!(report.status, HealthStatus::Failed);
    }

    #[test]
    fn test_options_parse() {
        let options = HealthOptions::parse(&["storage", "cache", "cache"], true).unwrap();
        assert_eq!(options.categories, vec![CheckCategory::Cache, CheckCategory::Storage]);
        assert!(options.fix);

        let empty: [&str; 0] = [];
        assert_eq!(HealthOptions::parse(&empty, false).unwrap().categories.len(), 5);
        assert!(matches!(HealthOptions::parse(&["network"], false), Err(Error::Validation(_))));
    }
}
