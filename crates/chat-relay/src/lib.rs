//! Relay endpoint for chat clients.
//!
//! Provides:
//! - `Hub` - Broadcast fan-out to every connected client
//! - `websocket` - Axum WebSocket handler and router
//! - `RelayConfig` - Bind address and route configuration

pub mod config;
pub mod hub;
pub mod server;
pub mod websocket;

pub use config::RelayConfig;
pub use hub::{Hub, Registration};
pub use server::{RelayError, serve, spawn_on};
pub use websocket::router;
