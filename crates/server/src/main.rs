//! pwa-sw server entry point.
//!
//! Boots an MCP server on stdio transport that hosts the offline cache
//! worker for one site. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use pwa_client::{FetchConfig, HttpNetwork};
use pwa_core::network::{ConnectivityFlag, GatedNetwork};
use pwa_core::{AppConfig, CacheDb, CacheStorage, MemoryCache};

mod handler;
mod host;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache_name = %config.cache_name(), start_page = %config.start_page, "Starting pwa-sw server on stdio transport");

    let cache: Arc<dyn CacheStorage> = match &config.db_path {
        Some(path) => Arc::new(CacheDb::open(path).await?),
        None => Arc::new(MemoryCache::new()),
    };

    let connectivity = Arc::new(ConnectivityFlag::default());
    let http = HttpNetwork::new(FetchConfig::from(&config))?;
    let network = Arc::new(GatedNetwork::new(http, connectivity.clone()));

    let host = host::WorkerHost::new(config, cache, network, connectivity)?;
    let handler = handler::PwaServer::new(Arc::new(host));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
