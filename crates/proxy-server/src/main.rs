//! # SAML Discovery Proxy
//!
//! Main entry point for the proxy server.

#![forbid(unsafe_code)]

use anyhow::Context;
use proxy_server::{ProxyConfig, Server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json");
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "SAML discovery proxy starting");

    let config = ProxyConfig::from_env().context("failed to load configuration")?;
    tracing::info!(
        base_url = %config.base_url,
        entity_id = %config.entity_id,
        mdq = %config.mdq_base_url,
        "configuration loaded"
    );

    Server::new(config).run().await
}
