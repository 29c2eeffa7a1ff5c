//! Connection lifecycle state machine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Connection state.
///
/// `Idle -> Connecting -> Open -> Closed`, with `Error` reachable from
/// `Connecting` or `Open` and always followed by `Closed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection attempt made yet.
    #[default]
    Idle,
    /// Handshake in flight.
    Connecting,
    /// Handshake completed; sends are permitted.
    Open,
    /// Connection ended, locally or remotely.
    Closed,
    /// Transport reported a failure.
    Error,
}

impl ConnectionState {
    /// Whether `self -> next` is an edge of the state machine.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle | Self::Closed, Self::Connecting)
                | (Self::Connecting, Self::Open | Self::Error | Self::Closed)
                | (Self::Open, Self::Closed | Self::Error)
                | (Self::Error, Self::Closed)
        )
    }

    /// Validate a transition, returning the new state.
    ///
    /// # Errors
    /// Returns [`InvalidTransition`] if the edge does not exist.
    pub const fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }

    /// Whether a connection attempt or session is in progress.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// Snake-case name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state-machine edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid connection state transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ConnectionState,
    pub to: ConnectionState,
}

/// Why a connection reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Closed by this client.
    Local,
    /// Closed by the relay with a close frame.
    Remote { code: u16, reason: String },
    /// Lost without a close handshake (network drop, failed handshake).
    Dropped(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("closed locally"),
            Self::Remote { code, reason } if reason.is_empty() => {
                write!(f, "closed by remote ({code})")
            }
            Self::Remote { code, reason } => write!(f, "closed by remote ({code}: {reason})"),
            Self::Dropped(cause) => write!(f, "dropped: {cause}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use ConnectionState::{Closed, Connecting, Error, Idle, Open};

    #[test]
    fn test_happy_path() {
        let state = assert_ok!(Idle.transition(Connecting));
        let state = assert_ok!(state.transition(Open));
        let state = assert_ok!(state.transition(Closed));
        assert_eq!(state, Closed);
    }

    #[test]
    fn test_error_edges() {
        assert!(Connecting.can_transition_to(Error));
        assert!(Open.can_transition_to(Error));
        assert!(Error.can_transition_to(Closed));
        assert!(!Idle.can_transition_to(Error));
        assert!(!Error.can_transition_to(Open));
        assert!(!Error.can_transition_to(Connecting));
    }

    #[test]
    fn test_reconnect_edge() {
        assert!(Closed.can_transition_to(Connecting));
        assert!(!Closed.can_transition_to(Open));
    }

    #[test]
    fn test_invalid_transition_reports_edge() {
        let err = assert_err!(Idle.transition(Open));
        assert_eq!(err, InvalidTransition { from: Idle, to: Open });
        assert_eq!(err.to_string(), "Invalid connection state transition: idle -> open");
    }

    #[test]
    fn test_is_active() {
        assert!(Connecting.is_active());
        assert!(Open.is_active());
        assert!(!Idle.is_active());
        assert!(!Closed.is_active());
        assert!(!Error.is_active());
    }

    #[test]
    fn test_close_reason_display() {
        let remote = CloseReason::Remote {
            code: 1000,
            reason: String::new(),
        };
        assert_eq!(remote.to_string(), "closed by remote (1000)");
        assert_eq!(CloseReason::Local.to_string(), "closed locally");
    }
}
