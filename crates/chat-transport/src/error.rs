//! Transport and configuration errors.

use std::{path::PathBuf, time::Duration};

use chat_core::{CodecError, ConnectionState};
use thiserror::Error;

/// Transport channel error.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Connection attempt timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("Not connected (state: {state})")]
    NotConnected { state: ConnectionState },
    #[error("Already connected (state: {state})")]
    AlreadyConnected { state: ConnectionState },
    #[error("No Tokio runtime to run the connection on")]
    NoRuntime,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Configuration error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid endpoint URL {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: &'static str },
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}
