//! appshell server entry point.
//!
//! Boots the offline-caching agent and exposes its host events as MCP tools
//! on stdio transport. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use appshell_client::{FetchConfig, HttpNetwork};
use appshell_core::{AppConfig, StoreDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod agent;
mod handler;
mod tools;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        cache = %config.cache_name(),
        origin = %config.origin,
        pinned = config.precache.len(),
        "Starting appshell server on stdio transport"
    );

    let storage = Arc::new(StoreDb::open(&config.db_path).await?);
    let network = Arc::new(HttpNetwork::new(config.origin_url()?, FetchConfig::from(&config))?);
    let worker = Arc::new(agent::ServiceWorker::new(&config, storage, network)?);

    let handler = handler::AppShellServer::new(Arc::clone(&worker));
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;
    worker.wait_until_settled().await;

    Ok(())
}
