//! Error types for the hub client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use hub_client::{Envelope, HubClient, Result};
//!
//! async fn example(client: &HubClient) -> Result<()> {
//!     client.send(Envelope::hub("chrome", "ping")).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::NotConnected`], [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Frame | [`Error::Parse`] |
//! | Capability | [`Error::Handler`], [`Error::Delivery`] |
//! | External | [`Error::InvalidUrl`], [`Error::Json`], [`Error::WebSocket`], [`Error::ChannelClosed`] |
//!
//! Nothing in this taxonomy is fatal to the host process: connection-level
//! failures degrade into a scheduled reconnect, frame-level failures into an
//! error notification, and handler failures into a `"500"` response envelope.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client options are invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Send attempted while no link is open.
    ///
    /// Reported synchronously to the caller; produces no transport activity.
    #[error("Not connected to hub")]
    NotConnected,

    /// Connection attempt or socket-level operation failed.
    ///
    /// Triggers unintentional-disconnect handling, never a crash.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while an operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Frame Errors
    // ========================================================================
    /// Malformed inbound frame.
    ///
    /// Reported to the consumer as a message-level error; the connection
    /// is unaffected.
    #[error("Malformed frame: {message}")]
    Parse {
        /// Description of the parse failure.
        message: String,
    },

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// A capability handler failed.
    ///
    /// Surfaced to the hub as a response envelope with a failure code and
    /// the error text as payload.
    #[error("Capability '{capability}' failed: {message}")]
    Handler {
        /// Name of the capability that failed.
        capability: String,
        /// Error text from the handler.
        message: String,
    },

    /// A response could not be delivered because the link was down.
    ///
    /// Logged locally, never retried; the remote caller times out.
    #[error("Response delivery failed: {message}")]
    Delivery {
        /// Description of the delivery failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// Hub endpoint URL is invalid.
    #[error("Invalid hub URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    ///
    /// Returned when the client actor has shut down.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    #[inline]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a handler error.
    #[inline]
    pub fn handler(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Creates a delivery error.
    #[inline]
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors resolve once the reconnect cycle restores the link.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::Delivery { .. }
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_not_connected_display() {
        assert_eq!(Error::NotConnected.to_string(), "Not connected to hub");
    }

    #[test]
    fn test_handler_error() {
        let err = Error::handler("capture", "no screen available");
        assert_eq!(
            err.to_string(),
            "Capability 'capture' failed: no screen available"
        );
    }

    #[test]
    fn test_is_connection_error() {
        let not_connected = Error::NotConnected;
        let conn_err = Error::connection("test");
        let closed_err = Error::ConnectionClosed;
        let parse_err = Error::parse("test");

        assert!(not_connected.is_connection_error());
        assert!(conn_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(!parse_err.is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        let conn_err = Error::connection("test");
        let delivery_err = Error::delivery("link down");
        let handler_err = Error::handler("capture", "test");

        assert!(conn_err.is_recoverable());
        assert!(delivery_err.is_recoverable());
        assert!(!handler_err.is_recoverable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_from_url_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }
}
