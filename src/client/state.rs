//! Connection state and consumer-facing notifications.
//!
//! [`ConnectionState`] is owned exclusively by the client actor and only
//! transitions through transport lifecycle events or explicit
//! connect/disconnect commands. [`HubEvent`] is the notification stream
//! handed to the consumer (the UI layer in the original deployment).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use crate::protocol::Envelope;

// ============================================================================
// ConnectionState
// ============================================================================

/// State of the hub link.
///
/// Transitions:
///
/// ```text
/// Disconnected ──connect()──► Connecting ──opened──► Connected
///      ▲                          │                      │
///      └────── failed/closed ─────┴────── closed/error ──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No link and no attempt in progress.
    #[default]
    Disconnected,
    /// Dial or WebSocket handshake in progress.
    Connecting,
    /// Link open and registered.
    Connected,
}

impl ConnectionState {
    /// Returns `true` if the state is [`Connected`](Self::Connected).
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if an attempt is in progress or the link is up.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Disconnected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(name)
    }
}

// ============================================================================
// HubEvent
// ============================================================================

/// Notification delivered to the consumer's event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// The link came up or went down.
    StatusChanged {
        /// `true` when the link is open and registered.
        active: bool,
        /// Failure reason on an unintentional transition down.
        error: Option<String>,
    },

    /// An inbound envelope not matching any registered capability,
    /// forwarded unchanged.
    Message(Envelope),

    /// An inbound frame that could not be parsed as an [`Envelope`].
    ///
    /// Emitted exactly once per bad frame; the connection is unaffected.
    ParseError {
        /// Description of the parse failure.
        message: String,
    },
}

impl HubEvent {
    /// Creates a link-up notification.
    #[inline]
    #[must_use]
    pub fn up() -> Self {
        Self::StatusChanged {
            active: true,
            error: None,
        }
    }

    /// Creates a link-down notification with a failure reason.
    #[inline]
    #[must_use]
    pub fn down(error: impl Into<String>) -> Self {
        Self::StatusChanged {
            active: false,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_state_predicates() {
        assert!(!ConnectionState::Disconnected.is_active());
        assert!(ConnectionState::Connecting.is_active());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Connected.is_connected());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }

    #[test]
    fn test_status_events() {
        assert_eq!(
            HubEvent::up(),
            HubEvent::StatusChanged {
                active: true,
                error: None
            }
        );
        assert_eq!(
            HubEvent::down("socket error"),
            HubEvent::StatusChanged {
                active: false,
                error: Some("socket error".to_string())
            }
        );
    }
}
