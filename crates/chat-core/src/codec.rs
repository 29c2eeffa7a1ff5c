//! Wire codec between text frames and [`ChatMessage`].
//!
//! Inbound frames are JSON objects carrying at least a string `body`.
//! Outbound frames are wrapped in the same envelope by default, so
//! `decode(encode(s))` yields `s`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{ChatMessage, RawFrame};

/// Name of the required envelope field.
pub const BODY_FIELD: &str = "body";

/// Decode failure for a single inbound frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Frame is not a JSON object, or `body` has the wrong type.
    #[error("Malformed message ({reason}): {raw:?}")]
    Malformed { raw: String, reason: String },
    /// Frame parsed but lacks a required field.
    #[error("Missing field `{field}`: {raw:?}")]
    MissingField { field: &'static str, raw: String },
}

impl CodecError {
    /// The offending wire text, for diagnostics.
    #[must_use]
    pub fn raw(&self) -> &str {
        match self {
            Self::Malformed { raw, .. } | Self::MissingField { raw, .. } => raw,
        }
    }
}

/// How outbound text is put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundFormat {
    /// `{"body": "<text>"}`.
    #[default]
    Envelope,
    /// The text as-is, for relays that wrap messages themselves.
    Raw,
}

/// Normalize an inbound frame into a [`ChatMessage`].
///
/// # Errors
/// Returns [`CodecError::Malformed`] if text is not a JSON object or its
/// `body` is not a string, and [`CodecError::MissingField`] if `body` is absent.
pub fn decode(frame: impl Into<RawFrame>) -> Result<ChatMessage, CodecError> {
    match frame.into() {
        RawFrame::Text(text) => decode_text(&text),
        RawFrame::Structured(msg) => Ok(msg),
    }
}

/// Decode wire text into a [`ChatMessage`].
///
/// # Errors
/// See [`decode`].
pub fn decode_text(text: &str) -> Result<ChatMessage, CodecError> {
    let value: Value = serde_json::from_str(text).map_err(|e| CodecError::Malformed {
        raw: text.to_owned(),
        reason: e.to_string(),
    })?;

    let Value::Object(mut fields) = value else {
        return Err(CodecError::Malformed {
            raw: text.to_owned(),
            reason: "expected a JSON object".to_string(),
        });
    };

    match fields.remove(BODY_FIELD) {
        Some(Value::String(body)) => Ok(ChatMessage::new(body)),
        Some(other) => Err(CodecError::Malformed {
            raw: text.to_owned(),
            reason: format!("`{BODY_FIELD}` must be a string, got {}", type_name(&other)),
        }),
        None => Err(CodecError::MissingField {
            field: BODY_FIELD,
            raw: text.to_owned(),
        }),
    }
}

/// Encode outgoing text as an envelope frame.
#[must_use]
pub fn encode(outgoing: &str) -> String {
    encode_with(OutboundFormat::Envelope, outgoing)
}

/// Encode outgoing text using the given format.
#[must_use]
pub fn encode_with(format: OutboundFormat, outgoing: &str) -> String {
    match format {
        OutboundFormat::Envelope => {
            let mut fields = serde_json::Map::with_capacity(1);
            fields.insert(BODY_FIELD.to_owned(), Value::String(outgoing.to_owned()));
            Value::Object(fields).to_string()
        }
        OutboundFormat::Raw => outgoing.to_owned(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
