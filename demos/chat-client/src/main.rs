//! Terminal chat client.
//!
//! Run with: cargo run -p chat-client-demo [config.json]
//!
//! Prints every message from the relay and sends each line typed on stdin.
//! The endpoint defaults to ws://localhost:9000/ws; override it with
//! `CHAT_ENDPOINT_URL` or an `endpointUrl` key in the config file.

use std::path::PathBuf;

use chat_transport::{ChannelConfig, ChannelError, ConnectionState, TransportChannel};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only chat messages.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ChannelConfig::load(config_path.as_deref())?;
    let channel = TransportChannel::new(config)?;

    let mut state = channel.subscribe_state();
    channel.connect(|msg| println!("{}", msg.body()))?;
    tracing::info!(endpoint = %channel.config().endpoint_url, "Type a message and press enter");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                match channel.send(text) {
                    Ok(()) => {}
                    Err(ChannelError::NotConnected { state: current }) => {
                        tracing::warn!(state = %current, "Message not sent");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *state.borrow_and_update();
                if current == ConnectionState::Closed && channel.config().reconnect.is_none() {
                    tracing::info!("Connection closed, exiting");
                    break;
                }
            }
        }
    }

    channel.close();
    Ok(())
}
