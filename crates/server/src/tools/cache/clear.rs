//! cache_clear tool implementation.
//!
//! Removes entries by scope: all, expired, project, or glob pattern.

use codex_cache_core::cache::{ClearScope, DocCache};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{blocking, json_result};

/// Parameters for the cache_clear tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheClearParams {
    /// One of `all`, `expired`, `project`, `pattern`.
    pub scope: String,

    /// Project name for `project`, glob over references for `pattern`.
    #[serde(default)]
    pub filter: Option<String>,

    /// Report what would be deleted without deleting it.
    #[serde(default)]
    pub dry_run: bool,
}

/// Implementation of the cache_clear tool.
pub async fn clear_impl(cache: &DocCache, params: CacheClearParams) -> Result<CallToolResult, McpError> {
    let scope = ClearScope::parse(&params.scope, params.filter.as_deref())?;
    let cache = cache.clone();
    let report = blocking(move || cache.clear(&scope, params.dry_run)).await?;
    json_result(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use codex_cache_core::cache::StoreRequest;

    fn seeded() -> (tempfile::TempDir, DocCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        for reference in ["@codex/acme/a.md", "@codex/acme/b.md", "@codex/other/c.md"] {
            cache.store(&StoreRequest::new(reference, "github", 7), b"doc").unwrap();
        }
        (dir, cache)
    }

    #[tokio::test]
    async fn test_clear_project() {
        let (dir, cache) = seeded();
        let params = CacheClearParams { scope: "project".into(), filter: Some("acme".into()), dry_run: false };

        let output = result_json(&clear_impl(&cache, params).await.unwrap());

        assert_eq!(output["deletedCount"], 2);
        assert_eq!(output["deletedSizeBytes"], 6);
        assert!(!dir.path().join("codex/acme/a.md").exists());
        assert!(dir.path().join("codex/other/c.md").exists());
    }

    #[tokio::test]
    async fn test_clear_dry_run_keeps_files() {
        let (dir, cache) = seeded();
        let params = CacheClearParams { scope: "all".into(), filter: None, dry_run: true };

        let output = result_json(&clear_impl(&cache, params).await.unwrap());

        assert_eq!(output["dryRun"], true);
        assert_eq!(output["deletedCount"], 3);
        assert!(dir.path().join("codex/acme/a.md").exists());
        assert_eq!(cache.load_index().unwrap().entries.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_rejects_missing_filter() {
        let (_dir, cache) = seeded();
        let params = CacheClearParams { scope: "pattern".into(), filter: None, dry_run: false };

        let err = clear_impl(&cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
