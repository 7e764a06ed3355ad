//! cache_store tool implementation.
//!
//! Writes a document into the cache, from inline text or a local file.

use std::path::PathBuf;

use codex_cache_core::cache::{CacheEntry, DocCache, StoreRequest};
use codex_cache_core::{AppConfig, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::{blocking, json_result};

/// Parameters for the cache_store tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoreParams {
    /// Reference to store under, e.g. `@codex/acme/readme.md`.
    pub reference: String,

    /// Origin of the document, e.g. `github`.
    pub source: String,

    /// Time to live in days (default: configured `default_ttl_days`).
    #[serde(default)]
    pub ttl_days: Option<u32>,

    /// Document text. Exactly one of `content` and `source_path` is required.
    #[serde(default)]
    pub content: Option<String>,

    /// Path of a local file to copy into the cache.
    #[serde(default)]
    pub source_path: Option<String>,
}

/// Output from the cache_store tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoreOutput {
    pub entry: CacheEntry,
}

/// Implementation of the cache_store tool.
pub async fn store_impl(
    cache: &DocCache, config: &AppConfig, params: CacheStoreParams,
) -> Result<CallToolResult, McpError> {
    let request = StoreRequest::new(params.reference, params.source, params.ttl_days.unwrap_or(config.default_ttl_days));
    let cache = cache.clone();

    let entry = match (params.content, params.source_path) {
        (Some(content), None) => blocking(move || cache.store(&request, content.as_bytes())).await?,
        (None, Some(path)) => blocking(move || cache.store_file(&request, &PathBuf::from(path))).await?,
        _ => {
            return Err(Error::Validation("exactly one of content or source_path must be given".into()).into());
        }
    };

    json_result(&CacheStoreOutput { entry })
}
