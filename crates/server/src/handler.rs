//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use codex_cache_core::cache::{DocCache, DocumentSource};
use codex_cache_core::AppConfig;

use crate::tools::cache::{
    CacheClearParams, CacheHealthParams, CacheLookupParams, CacheMetricsParams, CacheRebuildParams,
    CacheStoreParams, clear_impl, health_impl, lookup_impl, metrics_impl, rebuild_impl, store_impl,
};
use crate::tools::doc_fetch::{DocFetchParams, doc_fetch_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for codex-cache.
#[derive(Clone)]
pub struct CodexCacheServer {
    cache: DocCache,
    config: Arc<AppConfig>,
    source: Arc<dyn DocumentSource>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl CodexCacheServer {
    /// Create a new server handler over `cache`, fetching misses through `source`.
    pub fn new(cache: DocCache, config: AppConfig, source: Arc<dyn DocumentSource>) -> Self {
        Self { cache, config: Arc::new(config), source, tool_router: Self::tool_router() }
    }

    #[tool(description = "Store a document in the cache under a reference, from inline content or a local file path.")]
    async fn cache_store(&self, params: Parameters<CacheStoreParams>) -> Result<CallToolResult, McpError> {
        store_impl(&self.cache, &self.config, params.0).await
    }

    #[tool(description = "Check whether a reference is cached and fresh. Reason is one of not_in_cache, index_missing, not_in_index, expired, valid.")]
    async fn cache_lookup(&self, params: Parameters<CacheLookupParams>) -> Result<CallToolResult, McpError> {
        lookup_impl(&self.cache, params.0).await
    }

    #[tool(description = "Clear cache entries by scope (all, expired, project, pattern). Supports dry_run.")]
    async fn cache_clear(&self, params: Parameters<CacheClearParams>) -> Result<CallToolResult, McpError> {
        clear_impl(&self.cache, params.0).await
    }

    #[tool(description = "Run cache health checks by category. With fix, orphaned files are removed.")]
    async fn cache_health(&self, params: Parameters<CacheHealthParams>) -> Result<CallToolResult, McpError> {
        health_impl(&self.cache, Arc::clone(&self.config), params.0).await
    }

    #[tool(description = "Report cache size, freshness, hit rate, per-source breakdown, and recommendations.")]
    async fn cache_metrics(&self, params: Parameters<CacheMetricsParams>) -> Result<CallToolResult, McpError> {
        metrics_impl(&self.cache, Arc::clone(&self.config), params.0).await
    }

    #[tool(description = "Rebuild the cache index from the files on disk, e.g. after index corruption.")]
    async fn cache_rebuild(&self, params: Parameters<CacheRebuildParams>) -> Result<CallToolResult, McpError> {
        rebuild_impl(&self.cache, &self.config, params.0).await
    }

    /// Fetch a document through the cache.
    ///
    /// Fresh cached copies are returned without a network request.
    #[tool(description = "Fetch a document by reference, serving fresh copies from the cache and caching fetched ones.")]
    async fn doc_fetch(&self, params: Parameters<DocFetchParams>) -> Result<CallToolResult, McpError> {
        doc_fetch_impl(&self.cache, self.source.as_ref(), &self.config, params.0).await
    }
}

impl ServerHandler for CodexCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "codex-cache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use codex_cache_core::{Error, FetchedDocument};

    struct NoSource;

    #[async_trait]
    impl DocumentSource for NoSource {
        async fn fetch(&self, reference: &str) -> Result<FetchedDocument, Error> {
            Err(Error::NotFound(reference.to_string()))
        }
    }

    #[test]
    fn test_router_lists_every_tool() {
        let dir = tempfile::tempdir().unwrap();
        let server = CodexCacheServer::new(DocCache::open(dir.path()), AppConfig::default(), Arc::new(NoSource));

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_clear",
                "cache_health",
                "cache_lookup",
                "cache_metrics",
                "cache_rebuild",
                "cache_store",
                "doc_fetch"
            ]
        );
    }

    #[test]
    fn test_server_info() {
        let dir = tempfile::tempdir().unwrap();
        let server = CodexCacheServer::new(DocCache::open(dir.path()), AppConfig::default(), Arc::new(NoSource));
        assert_eq!(server.get_info().server_info.name, "codex-cache");
    }
}
