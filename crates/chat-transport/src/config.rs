//! Channel configuration.
//!
//! Layers, lowest priority first: compiled defaults, an optional JSON file,
//! then `CHAT_*` environment variables.

use std::{path::Path, time::Duration};

use chat_core::OutboundFormat;
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::http::Uri;

use crate::{error::ConfigError, reconnect::ExponentialBackoff};

/// Development relay address.
pub const DEFAULT_ENDPOINT_URL: &str = "ws://localhost:9000/ws";

/// Environment override for [`ChannelConfig::endpoint_url`].
pub const ENV_ENDPOINT_URL: &str = "CHAT_ENDPOINT_URL";

/// Environment override for [`ChannelConfig::connect_timeout_ms`].
pub const ENV_CONNECT_TIMEOUT_MS: &str = "CHAT_CONNECT_TIMEOUT_MS";

/// Transport channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelConfig {
    /// Relay endpoint, `ws://` or `wss://`.
    pub endpoint_url: String,
    /// Handshake deadline in milliseconds.
    pub connect_timeout_ms: u64,
    /// Reconnection schedule. `None` disables reconnection.
    pub reconnect: Option<ReconnectConfig>,
    /// Wire format for outbound text.
    pub outbound_format: OutboundFormat,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            connect_timeout_ms: 10_000,
            reconnect: None,
            outbound_format: OutboundFormat::Envelope,
        }
    }
}

impl ChannelConfig {
    /// Create a config for the given endpoint with default settings.
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    /// Set the handshake deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Enable reconnection.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = Some(reconnect);
        self
    }

    /// Set the outbound wire format.
    #[must_use]
    pub fn with_outbound_format(mut self, format: OutboundFormat) -> Self {
        self.outbound_format = format;
        self
    }

    /// Handshake deadline.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Parse a JSON config document. Missing keys take their defaults.
    ///
    /// # Errors
    /// Returns error if the JSON is invalid or the endpoint fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Defaults with process environment overrides applied.
    ///
    /// # Errors
    /// Returns error if an override is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Defaults, then `path` if given, then process environment overrides.
    ///
    /// # Errors
    /// Returns error if any layer is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply `CHAT_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    /// Returns error if an override is invalid.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_ENDPOINT_URL) {
            self.endpoint_url = url;
        }
        if let Some(value) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            self.connect_timeout_ms = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_CONNECT_TIMEOUT_MS,
                value,
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check that the endpoint is a `ws://` or `wss://` URL with a host.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidEndpoint`] otherwise.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidEndpoint {
            url: self.endpoint_url.clone(),
            reason,
        };

        let uri: Uri = self
            .endpoint_url
            .parse()
            .map_err(|_| invalid("not a valid URL"))?;

        match uri.scheme_str() {
            Some("ws" | "wss") => {}
            Some(_) => return Err(invalid("scheme must be ws or wss")),
            None => return Err(invalid("missing scheme")),
        }

        if uri.host().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }

        Ok(())
    }
}

/// Exponential back-off settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectConfig {
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive retries.
    pub multiplier: f64,
    /// Give up after this many consecutive failures. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl From<&ReconnectConfig> for ExponentialBackoff {
    fn from(config: &ReconnectConfig) -> Self {
        Self::new(
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
        .with_multiplier(config.multiplier)
        .with_max_attempts(config.max_attempts)
    }
}
