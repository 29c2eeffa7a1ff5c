//! Lifecycle hooks for a transport channel.

use chat_core::{CloseReason, CodecError};

use crate::error::ChannelError;

/// Observer for connection lifecycle events.
///
/// Callbacks run on the connection task, serially and in the order the
/// events occur. They must not block.
pub trait ChannelObserver: Send + Sync {
    /// Handshake completed.
    fn on_open(&self) {}

    /// Connection reached `Closed`.
    fn on_close(&self, _reason: &CloseReason) {}

    /// Transport failure. Always followed by [`Self::on_close`].
    fn on_error(&self, _error: &ChannelError) {}

    /// Inbound frame dropped because it could not be decoded.
    fn on_frame_rejected(&self, _error: &CodecError) {}
}

/// Observer that reports lifecycle events through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    endpoint: String,
}

impl LoggingObserver {
    /// Create an observer that tags events with `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

impl ChannelObserver for LoggingObserver {
    fn on_open(&self) {
        tracing::info!(endpoint = %self.endpoint, "Successfully connected");
    }

    fn on_close(&self, reason: &CloseReason) {
        tracing::info!(endpoint = %self.endpoint, %reason, "Socket closed connection");
    }

    fn on_error(&self, error: &ChannelError) {
        tracing::error!(endpoint = %self.endpoint, "Socket error: {error}");
    }

    fn on_frame_rejected(&self, error: &CodecError) {
        tracing::warn!(endpoint = %self.endpoint, "Dropping inbound frame: {error}");
    }
}
