//! Chat relay server.
//!
//! Run with: cargo run -p relay-server-demo
//!
//! Listens on ws://0.0.0.0:9000/ws unless `CHAT_RELAY_ADDR` says otherwise.

use chat_relay::RelayConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    tracing::info!(addr = %config.bind_addr, path = %config.path, "Relay starting");
    chat_relay::serve(config).await?;
    Ok(())
}
