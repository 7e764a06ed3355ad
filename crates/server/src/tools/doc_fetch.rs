//! doc_fetch tool implementation.
//!
//! Returns a document from the cache when fresh, fetching and caching it
//! otherwise. This is what drives the hit/miss statistics.

use codex_cache_core::cache::{CacheEntry, DocCache, DocumentSource};
use codex_cache_core::AppConfig;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Input parameters for doc_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocFetchParams {
    /// `@codex/{project}/{path}` or an http(s) URL.
    pub reference: String,

    /// Time to live in days for a newly fetched copy (default: configured `default_ttl_days`).
    #[serde(default)]
    pub ttl_days: Option<u32>,

    /// Force a refresh, bypassing the cache.
    #[serde(default)]
    pub force_refresh: bool,
}

/// Output from the doc_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocFetchOutput {
    pub entry: CacheEntry,
    pub from_cache: bool,
    /// Document text (invalid UTF-8 replaced).
    pub content: String,
}

/// Implementation of the doc_fetch tool.
pub async fn doc_fetch_impl(
    cache: &DocCache, source: &dyn DocumentSource, config: &AppConfig, params: DocFetchParams,
) -> Result<CallToolResult, McpError> {
    let ttl_days = params.ttl_days.unwrap_or(config.default_ttl_days);
    let outcome = cache
        .get_or_fetch(source, &params.reference, ttl_days, params.force_refresh)
        .await?;

    let output = DocFetchOutput { content: outcome.text(), entry: outcome.entry, from_cache: outcome.from_cache };
    json_result(&output)
}
