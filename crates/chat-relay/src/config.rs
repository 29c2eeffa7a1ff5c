//! Relay configuration.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{hub::DEFAULT_CAPACITY, server::RelayError};

/// Environment override for [`RelayConfig::bind_addr`].
pub const ENV_RELAY_ADDR: &str = "CHAT_RELAY_ADDR";

/// Relay server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// WebSocket route.
    pub path: String,
    /// Per-client broadcast buffer.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
            path: "/ws".to_string(),
            channel_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Defaults with process environment overrides applied.
    ///
    /// # Errors
    /// Returns error if an override is invalid.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::default().apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply `CHAT_RELAY_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    /// Returns error if an override is invalid.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_RELAY_ADDR) {
            self.bind_addr = value.trim().parse().map_err(|_| RelayError::InvalidEnv {
                var: ENV_RELAY_ADDR,
                value,
            })?;
        }
        Ok(self)
    }
}
