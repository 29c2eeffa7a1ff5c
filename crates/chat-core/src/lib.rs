//! Core types for the chat client.
//!
//! This crate provides the pieces that carry no I/O:
//! - `ChatMessage` - Normalized application-level message
//! - `RawFrame` - Inbound frame before normalization
//! - `codec` - Wire encode/decode
//! - `ConnectionState` - Connection lifecycle state machine

pub mod codec;
pub mod message;
pub mod state;

pub use codec::{CodecError, OutboundFormat, decode, decode_text, encode, encode_with};
pub use message::{ChatMessage, RawFrame};
pub use state::{CloseReason, ConnectionState, InvalidTransition};
