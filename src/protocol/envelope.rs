//! Envelope message type.
//!
//! Defines the single message unit exchanged with the hub, for control
//! frames (`register`, `heartbeat`), capability requests, correlated
//! responses, and free-form application traffic.
//!
//! # Format
//!
//! ```json
//! {
//!   "type": "response",
//!   "id": "uuid",
//!   "reference": "request-uuid",
//!   "sender": "chrome",
//!   "recipient": "ai",
//!   "code": "200",
//!   "payload": "..."
//! }
//! ```
//!
//! Empty fields are omitted on the wire; missing fields parse as empty.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

// ============================================================================
// Well-Known Kinds
// ============================================================================

/// Well-known values for [`Envelope::kind`].
///
/// Any other value is either a capability name (hub → client request) or an
/// application action routed unchanged to the consumer.
pub mod kind {
    /// Endpoint registration, sent once per successful open.
    pub const REGISTER: &str = "register";
    /// Endpoint removal, accepted by the hub before close.
    pub const UNREGISTER: &str = "unregister";
    /// Periodic liveness signal.
    pub const HEARTBEAT: &str = "heartbeat";
    /// Generic request marker.
    pub const REQUEST: &str = "request";
    /// Correlated reply to a request.
    pub const RESPONSE: &str = "response";
    /// Fan-out to all registered endpoints.
    pub const BROADCAST: &str = "broadcast";
    /// Point-to-point application message.
    pub const PRIVATE: &str = "private";
    /// Message addressed to the hub itself.
    pub const HUB: &str = "hub";
}

// ============================================================================
// Status Codes
// ============================================================================

/// String status codes carried in [`Envelope::code`] on responses.
pub mod code {
    /// Request accepted, processing continues.
    pub const CONTINUE: &str = "100";
    /// Success.
    pub const OK: &str = "200";
    /// Request was malformed or unsupported.
    pub const BAD_REQUEST: &str = "400";
    /// Handler failed.
    pub const INTERNAL_ERROR: &str = "500";
}

// ============================================================================
// Envelope
// ============================================================================

/// The unit exchanged over the hub link.
///
/// `kind` (wire name `type`) selects routing: well-known control kinds,
/// a registered capability name, or free-form application traffic. All other
/// fields are optional on the wire and default to empty when absent.
///
/// A `response` envelope carries `reference` equal to the `id` of the request
/// it answers; correlation is a stateless echo, no pending-request table is
/// kept on either side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Message kind (wire field `type`).
    #[serde(rename = "type")]
    pub kind: String,

    /// Correlation identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,

    /// Logical source endpoint name (e.g. "chrome", "ai").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sender: String,

    /// Logical destination endpoint name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recipient: String,

    /// Request action, carried opaquely.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub action: String,

    /// On responses: the `id` of the request being answered.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,

    /// On responses: string status code ("100", "200", "400", "500").
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,

    /// Opaque payload, frequently itself JSON-encoded.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payload: String,
}

// ============================================================================
// Envelope - Constructors
// ============================================================================

impl Envelope {
    /// Creates a `register` envelope announcing this endpoint.
    #[inline]
    #[must_use]
    pub fn register(sender: impl Into<String>) -> Self {
        Self {
            kind: kind::REGISTER.to_string(),
            sender: sender.into(),
            ..Self::default()
        }
    }

    /// Creates an `unregister` envelope for this endpoint.
    #[inline]
    #[must_use]
    pub fn unregister(sender: impl Into<String>) -> Self {
        Self {
            kind: kind::UNREGISTER.to_string(),
            sender: sender.into(),
            ..Self::default()
        }
    }

    /// Creates a `heartbeat` envelope naming this endpoint.
    #[inline]
    #[must_use]
    pub fn heartbeat(sender: impl Into<String>) -> Self {
        Self {
            kind: kind::HEARTBEAT.to_string(),
            sender: sender.into(),
            ..Self::default()
        }
    }

    /// Creates a hub-directed envelope with a free-form payload.
    #[inline]
    #[must_use]
    pub fn hub(sender: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: kind::HUB.to_string(),
            id: generate_id(),
            sender: sender.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Creates a request envelope with an auto-generated id.
    #[must_use]
    pub fn request(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        action: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind::REQUEST.to_string(),
            id: generate_id(),
            sender: sender.into(),
            recipient: recipient.into(),
            action: action.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }

    /// Creates the `response` envelope answering `request`.
    ///
    /// `reference` echoes the request's `id` and `recipient` its `sender`;
    /// the response gets a fresh id of its own.
    #[must_use]
    pub fn response_to(
        request: &Envelope,
        sender: impl Into<String>,
        code: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind::RESPONSE.to_string(),
            id: generate_id(),
            sender: sender.into(),
            recipient: request.sender.clone(),
            reference: request.id.clone(),
            code: code.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Envelope - Predicates & Serialization
// ============================================================================

impl Envelope {
    /// Returns `true` if this is a `response` envelope.
    #[inline]
    #[must_use]
    pub fn is_response(&self) -> bool {
        self.kind == kind::RESPONSE
    }

    /// Returns `true` if this is a `heartbeat` envelope.
    #[inline]
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        self.kind == kind::HEARTBEAT
    }

    /// Returns `true` if the response code signals success.
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code == code::OK
    }

    /// Serializes the envelope to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) on serialization failure.
    #[inline]
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses an envelope from a JSON text frame.
    ///
    /// Unknown fields are ignored; missing optional fields parse as empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the frame is not a
    /// JSON object with a string `type`.
    #[inline]
    pub fn from_frame(frame: &str) -> Result<Self> {
        Ok(serde_json::from_str(frame)?)
    }
}

/// Generates a fresh envelope id.
#[inline]
fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_frame_shape() {
        let frame = Envelope::register("chrome").to_frame().expect("serialize");
        assert_eq!(frame, r#"{"type":"register","sender":"chrome"}"#);
    }

    #[test]
    fn test_heartbeat_frame_shape() {
        let heartbeat = Envelope::heartbeat("chrome");
        assert!(heartbeat.is_heartbeat());
        let frame = heartbeat.to_frame().expect("serialize");
        assert_eq!(frame, r#"{"type":"heartbeat","sender":"chrome"}"#);
    }

    #[test]
    fn test_parse_capability_request() {
        let envelope =
            Envelope::from_frame(r#"{"type":"capture","id":"r1","sender":"ai"}"#).expect("parse");

        assert_eq!(envelope.kind, "capture");
        assert_eq!(envelope.id, "r1");
        assert_eq!(envelope.sender, "ai");
        assert_eq!(envelope.recipient, "");
        assert_eq!(envelope.payload, "");
    }

    #[test]
    fn test_parse_ignores_unknown_fields() {
        let envelope = Envelope::from_frame(
            r#"{"type":"broadcast","sender":"ai","timestamp":"2024-01-01T00:00:00Z"}"#,
        )
        .expect("parse");

        assert_eq!(envelope.kind, kind::BROADCAST);
        assert_eq!(envelope.sender, "ai");
    }

    #[test]
    fn test_parse_rejects_malformed_frame() {
        assert!(Envelope::from_frame("not json").is_err());
        assert!(Envelope::from_frame(r#"{"sender":"ai"}"#).is_err());
    }

    #[test]
    fn test_response_correlation() {
        let request =
            Envelope::from_frame(r#"{"type":"capture","id":"r1","sender":"ai"}"#).expect("parse");
        let response = Envelope::response_to(&request, "chrome", code::OK, "<data>");

        assert_eq!(response.kind, kind::RESPONSE);
        assert_eq!(response.reference, "r1");
        assert_eq!(response.sender, "chrome");
        assert_eq!(response.recipient, "ai");
        assert_eq!(response.code, "200");
        assert_eq!(response.payload, "<data>");
        assert!(response.is_response());
        assert!(response.is_ok());
        assert_ne!(response.id, request.id);
    }

    #[test]
    fn test_request_ids_are_unique() {
        let a = Envelope::request("chrome", "ai", "ask", "hello");
        let b = Envelope::request("chrome", "ai", "ask", "hello");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_response_wire_fields() {
        let request = Envelope {
            kind: "capture".to_string(),
            id: "r1".to_string(),
            sender: "ai".to_string(),
            ..Envelope::default()
        };
        let frame = Envelope::response_to(&request, "chrome", code::INTERNAL_ERROR, "boom")
            .to_frame()
            .expect("serialize");

        assert!(frame.contains(r#""type":"response""#));
        assert!(frame.contains(r#""reference":"r1""#));
        assert!(frame.contains(r#""code":"500""#));
        // Unused fields stay off the wire.
        assert!(!frame.contains("action"));
    }
}
