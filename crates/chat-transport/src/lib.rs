//! Transport channel for the chat client.
//!
//! Provides:
//! - `TransportChannel` - One WebSocket connection to a relay endpoint
//! - `ChannelConfig` - Endpoint and timing configuration
//! - `ReconnectPolicy` - Pluggable retry schedule
//! - `ChannelObserver` - Lifecycle hooks (open/close/error)

pub mod channel;
pub mod config;
pub mod error;
pub mod observer;
pub mod reconnect;

pub use channel::TransportChannel;
pub use chat_core::{ChatMessage, CloseReason, CodecError, ConnectionState, OutboundFormat};
pub use config::{ChannelConfig, ReconnectConfig};
pub use error::{ChannelError, ConfigError};
pub use observer::{ChannelObserver, LoggingObserver};
pub use reconnect::{ExponentialBackoff, NoReconnect, ReconnectPolicy};
