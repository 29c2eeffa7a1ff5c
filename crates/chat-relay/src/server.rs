//! Relay server entry points.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::{net::TcpListener, task::JoinHandle};

use crate::{config::RelayConfig, hub::Hub, websocket::router};

/// Relay server error.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Bind `config.bind_addr` and relay until the server fails.
///
/// # Errors
/// Returns error if binding or serving fails.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.bind_addr,
            source,
        })?;
    let hub = Hub::new(config.channel_capacity);

    tracing::info!("Relay listening on ws://{}{}", listener.local_addr()?, config.path);
    axum::serve(listener, router(hub, &config.path)).await?;
    Ok(())
}

/// Relay on an already-bound listener in a background task.
#[must_use]
pub fn spawn_on(listener: TcpListener, hub: Hub, path: &str) -> JoinHandle<Result<(), RelayError>> {
    let app = router(hub, path);
    tokio::spawn(async move {
        axum::serve(listener, app).await?;
        Ok(())
    })
}
