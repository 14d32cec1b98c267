mod client;
mod config;
mod document;
mod error;
mod readiness;
mod server;
mod tools;

use std::sync::Arc;

use anyhow::{Context, Result};
use client::RestClient;
use config::Config;
use server::StdioServer;
use tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file (may carry RUST_LOG)
    dotenv::dotenv().ok();

    // Initialize logging (stderr; stdout belongs to the protocol)
    pretty_env_logger::formatted_builder()
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();
    log::info!("Starting Obsidian bridge...");

    // Load configuration
    let config_path =
        std::env::var("OBSIDIAN_BRIDGE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)?;
    log::info!("Configuration loaded ({})", config.obsidian.base_url);

    let client = RestClient::from_config(&config).context("Failed to initialize HTTP transport")?;
    if !client.is_configured() {
        log::warn!("OBSIDIAN_API_KEY is not set. Tools will fail until configured.");
    }

    let server = StdioServer::new(ToolRegistry::new(Arc::new(client)));
    if let Err(e) = server.run().await {
        log::error!("Server error: {:#}", e);
        return Err(e);
    }

    log::info!("Obsidian bridge stopped");
    Ok(())
}
