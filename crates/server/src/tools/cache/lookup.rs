//! cache_lookup tool implementation.
//!
//! Reports whether a reference is cached and still fresh. Never writes.

use codex_cache_core::cache::DocCache;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{blocking, json_result};

/// Parameters for the cache_lookup tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheLookupParams {
    /// Reference to look up.
    pub reference: String,
}

/// Implementation of the cache_lookup tool.
pub async fn lookup_impl(cache: &DocCache, params: CacheLookupParams) -> Result<CallToolResult, McpError> {
    let cache = cache.clone();
    let result = blocking(move || cache.lookup(&params.reference)).await?;
    json_result(&result)
}
