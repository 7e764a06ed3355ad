//! Scoped invalidation: all, expired, by project, or by glob pattern.

use super::atomic::remove_file_if_exists;
use super::entry::{CacheEntry, CacheIndex};
use super::handle::DocCache;
use super::reference::{absolute_path, project_prefix};
use crate::Error;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobMatcher};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which entries a clear selects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "scope", content = "filter", rename_all = "snake_case")]
pub enum ClearScope {
    All,
    /// Entries with `expires_at < now`.
    Expired,
    /// Entries whose reference starts with `@codex/{project}/`.
    Project(String),
    /// Entries whose reference matches a glob.
    Pattern(String),
}

impl ClearScope {
    /// Build a scope from its name and optional filter value.
    ///
    /// # Errors
    ///
    /// `Error::Validation` for an unknown scope, a missing or malformed filter,
    /// or an invalid glob.
    pub fn parse(scope: &str, filter: Option<&str>) -> Result<Self, Error> {
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        let parsed = match scope.trim().to_ascii_lowercase().as_str() {
            "all" => ClearScope::All,
            "expired" => ClearScope::Expired,
            "project" => {
                let project = filter.ok_or_else(|| Error::Validation("scope 'project' requires a project name".into()))?;
                if project.contains('/') {
                    return Err(Error::Validation(format!("project name must not contain '/': {project}")));
                }
                ClearScope::Project(project.to_string())
            }
            "pattern" => {
                let pattern = filter.ok_or_else(|| Error::Validation("scope 'pattern' requires a glob".into()))?;
                ClearScope::Pattern(pattern.to_string())
            }
            other => {
                return Err(Error::Validation(format!(
                    "unknown scope '{other}' (expected all, expired, project, or pattern)"
                )));
            }
        };
        parsed.selector()?;
        Ok(parsed)
    }

    fn selector(&self) -> Result<Selector, Error> {
        Ok(match self {
            ClearScope::All => Selector::All,
            ClearScope::Expired => Selector::Expired,
            ClearScope::Project(project) => Selector::Prefix(project_prefix(project)),
            ClearScope::Pattern(pattern) => {
                let glob = Glob::new(pattern).map_err(|e| Error::Validation(format!("invalid pattern: {e}")))?;
                Selector::Glob(glob.compile_matcher())
            }
        })
    }
}

impl fmt::Display for ClearScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearScope::All => write!(f, "all"),
            ClearScope::Expired => write!(f, "expired"),
            ClearScope::Project(project) => write!(f, "project:{project}"),
            ClearScope::Pattern(pattern) => write!(f, "pattern:{pattern}"),
        }
    }
}

enum Selector {
    All,
    Expired,
    Prefix(String),
    Glob(GlobMatcher),
}

impl Selector {
    fn matches(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        match self {
            Selector::All => true,
            Selector::Expired => entry.is_past_expiry(now),
            Selector::Prefix(prefix) => entry.reference.starts_with(prefix.as_str()),
            Selector::Glob(matcher) => matcher.is_match(&entry.reference),
        }
    }

    fn candidates(&self, index: &CacheIndex, now: DateTime<Utc>) -> Vec<CacheEntry> {
        index.entries.values().filter(|e| self.matches(e, now)).cloned().collect()
    }
}

/// Outcome of a clear, or of a dry run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearReport {
    pub scope: String,
    pub dry_run: bool,
    pub deleted_count: usize,
    pub deleted_size_bytes: u64,
    pub deleted_entries: Vec<CacheEntry>,
    pub message: String,
}

impl ClearReport {
    fn new(scope: &ClearScope, dry_run: bool, entries: Vec<CacheEntry>) -> Self {
        let deleted_count = entries.len();
        let deleted_size_bytes = entries.iter().map(|e| e.size_bytes).sum();
        let message = match (deleted_count, dry_run) {
            (0, _) => format!("no entries matched scope {scope}"),
            (n, true) => format!("would delete {n} entries ({deleted_size_bytes} bytes)"),
            (n, false) => format!("deleted {n} entries ({deleted_size_bytes} bytes)"),
        };
        Self { scope: scope.to_string(), dry_run, deleted_count, deleted_size_bytes, deleted_entries: entries, message }
    }
}

impl DocCache {
    /// Remove every entry selected by `scope`, with its backing file.
    ///
    /// With `dry_run` nothing is touched and the report lists what would go.
    /// A backing file that is already gone is not an error. Any other
    /// deletion failure stops the clear; entries removed up to that point are
    /// still dropped from the index before the error is returned.
    pub fn clear(&self, scope: &ClearScope, dry_run: bool) -> Result<ClearReport, Error> {
        let selector = scope.selector()?;

        if dry_run {
            let now = self.now();
            let candidates = selector.candidates(&self.load_index()?, now);
            return Ok(ClearReport::new(scope, true, candidates));
        }

        let (removed, failure) = self.update_index(|index| {
            let now = self.now();
            let mut removed = Vec::new();
            let mut failure = None;

            for entry in selector.candidates(index, now) {
                let path = absolute_path(self.root(), &entry.path);
                match remove_file_if_exists(&path) {
                    Ok(existed) => {
                        if !existed {
                            tracing::debug!(reference = %entry.reference, "backing file already gone");
                        }
                    }
                    Err(err) => {
                        failure = Some(Error::storage(&format!("delete {}", entry.path), err));
                        break;
                    }
                }
                index.remove(&entry.reference);
                removed.push(entry);
            }

            if !removed.is_empty() {
                index.stats.last_cleanup = Some(now);
            }
            Ok((removed, failure))
        })?;

        if let Some(err) = failure {
            tracing::warn!(scope = %scope, removed = removed.len(), error = %err, "clear stopped early");
            return Err(err);
        }

        let report = ClearReport::new(scope, false, removed);
        tracing::debug!(scope = %scope, deleted = report.deleted_count, bytes = report.deleted_size_bytes, "cache cleared");
        Ok(report)
    }
}
