//! cache_metrics tool implementation.

use std::sync::Arc;

use codex_cache_core::AppConfig;
use codex_cache_core::cache::DocCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{blocking, json_result};

/// Parameters for the cache_metrics tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMetricsParams {
    /// How many of the largest entries to list (default: 10).
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_top_n() -> usize {
    10
}

/// Implementation of the cache_metrics tool.
pub async fn metrics_impl(
    cache: &DocCache, config: Arc<AppConfig>, params: CacheMetricsParams,
) -> Result<CallToolResult, McpError> {
    let cache = cache.clone();
    let metrics = blocking(move || cache.metrics(&config, params.top_n)).await?;
    json_result(&metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::result_json;
    use codex_cache_core::cache::StoreRequest;

    #[tokio::test]
    async fn test_metrics_counts_documents() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DocCache::open(dir.path());
        cache.store(&StoreRequest::new("@codex/acme/a.md", "github", 7), b"aaaa").unwrap();
        cache.store(&StoreRequest::new("https://docs.example.com/b", "docs.example.com", 7), b"bb").unwrap();

        let params = CacheMetricsParams { top_n: 1 };
        let output = result_json(&metrics_impl(&cache, Arc::new(AppConfig::default()), params).await.unwrap());

        assert_eq!(output["totalDocuments"], 2);
        assert_eq!(output["totalSizeBytes"], 6);
        assert_eq!(output["largest"].as_array().unwrap().len(), 1);
        assert_eq!(output["largest"][0]["reference"], "@codex/acme/a.md");
    }

    #[tokio::test]
    async fn test_metrics_corrupt_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), b"[").unwrap();
        let cache = DocCache::open(dir.path());

        let err = metrics_impl(&cache, Arc::new(AppConfig::default()), CacheMetricsParams { top_n: 5 })
            .await
            .unwrap_err();
        assert_eq!(err.code.0, -32002);
    }
}
