//! cache_rebuild tool implementation.
//!
//! Reconstructs the index from the files on disk after corruption or loss.

use codex_cache_core::AppConfig;
use codex_cache_core::cache::DocCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{blocking, json_result};

/// Parameters for the cache_rebuild tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheRebuildParams {
    /// TTL for re-adopted files (default: configured `default_ttl_days`).
    #[serde(default)]
    pub ttl_days: Option<u32>,
}

/// Implementation of the cache_rebuild tool.
pub async fn rebuild_impl(
    cache: &DocCache, config: &AppConfig, params: CacheRebuildParams,
) -> Result<CallToolResult, McpError> {
    let ttl_days = params.ttl_days.unwrap_or(config.default_ttl_days);
    let cache = cache.clone();
    let report = blocking(move || cache.rebuild_index(ttl_days)).await?;
    json_result(&report)
}
