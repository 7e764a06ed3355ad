//! cache_health tool implementation.
//!
//! Runs the health checks, optionally removing orphaned files.

use std::sync::Arc;

use codex_cache_core::AppConfig;
use codex_cache_core::cache::{DocCache, HealthOptions};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{blocking, json_result};

/// Parameters for the cache_health tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheHealthParams {
    /// Categories to check: `cache`, `config`, `performance`, `storage`,
    /// `system`, or `all` (default).
    #[serde(default)]
    pub categories: Vec<String>,

    /// Remove orphaned files found by the cache checks.
    #[serde(default)]
    pub fix: bool,
}

/// Implementation of the cache_health tool.
///
/// A degraded or failed cache is still a successful call; the status is in
/// the report.
pub async fn health_impl(
    cache: &DocCache, config: Arc<AppConfig>, params: CacheHealthParams,
) -> Result<CallToolResult, McpError> {
    let options = HealthOptions::parse(&params.categories, params.fix)?;
    let cache = cache.clone();
    let report = blocking(move || cache.health(&config, &options)).await?;
    json_result(&report)
}
