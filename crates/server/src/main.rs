//! world-anvil-mcp server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anvil_client::{AnvilClient, AnvilConfig, AnvilError};
use anvil_core::AppConfig;
use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod resources;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    let client = match AnvilClient::new(AnvilConfig::from(&config)) {
        Ok(client) => Some(client),
        Err(AnvilError::MissingCredentials(reason)) => {
            tracing::warn!(%reason, "World Anvil credentials not configured; only get_api_status is available");
            None
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(api_base = %config.api_base, "Starting world-anvil-mcp server on stdio transport");

    let handler = handler::WorldAnvilServer::new(config, client.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    if let Some(client) = client {
        client.shutdown().await;
    }

    Ok(())
}
