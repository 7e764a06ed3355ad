//! codex-cache MCP server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use codex_cache_client::HttpSource;
use codex_cache_core::{AppConfig, DocCache};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    tracing::info!(cache_dir = %config.cache_dir.display(), "Starting codex-cache server on stdio transport");

    let cache = DocCache::open(&config.cache_dir);
    let source = HttpSource::from_app_config(&config).context("building HTTP source")?;
    let handler = handler::CodexCacheServer::new(cache, config, Arc::new(source));

    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
