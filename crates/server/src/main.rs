//! sw-cache server entry point.
//!
//! Loads configuration, opens cache storage and boots the MCP server on stdio
//! transport. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swcache_core::{AppConfig, CacheDb};
use swcache_worker::{CacheManager, FetchConfig, HttpFetcher, WorkerSettings};
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

    let config = AppConfig::load().context("failed to load configuration")?;
    tracing::info!(
        cache = %config.cache_name,
        origin = %config.origin,
        strategy = %config.strategy,
        db = %config.db_path.display(),
        "Starting sw-cache server on stdio transport"
    );

    let settings = WorkerSettings::from_config(&config)?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open cache storage at {}", config.db_path.display()))?;
    let fetcher = HttpFetcher::new(FetchConfig::from(&config))?;

    let handler = handler::SwCacheServer::new(CacheManager::new(settings, db, fetcher));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
