//! Capability handlers.
//!
//! A capability is a locally implemented operation the hub can invoke by
//! sending an envelope whose `type` names it (e.g. `capture` for a screen
//! grab). Handlers are registered by name and produce a status code plus
//! payload; the client turns that into exactly one correlated `response`
//! envelope per request.
//!
//! Capability implementations themselves (tray windows, screenshots,
//! clipboard) live outside this crate; only the contract is defined here.
//!
//! # Example
//!
//! ```ignore
//! use hub_client::{CapabilityFn, CapabilityReply};
//!
//! let handler = CapabilityFn::new(|_request| async {
//!     Ok(CapabilityReply::ok("<png data url>"))
//! });
//! client.register_capability("capture", handler);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::protocol::{Envelope, code};

// ============================================================================
// CapabilityReply
// ============================================================================

/// Result of a capability invocation: a status code and an opaque payload.
///
/// Becomes the `code`/`payload` of the correlated `response` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityReply {
    /// String status code ("200", "500", ...).
    pub code: String,
    /// Opaque result payload.
    pub payload: String,
}

impl CapabilityReply {
    /// Creates a reply with an explicit code.
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            payload: payload.into(),
        }
    }

    /// Creates a successful ("200") reply.
    #[inline]
    #[must_use]
    pub fn ok(payload: impl Into<String>) -> Self {
        Self::new(code::OK, payload)
    }

    /// Creates a failure ("500") reply carrying the error text.
    #[inline]
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(code::INTERNAL_ERROR, message)
    }
}

// ============================================================================
// CapabilityHandler
// ============================================================================

/// A locally registered function fulfilling a named request type.
///
/// The handler receives the full request envelope and eventually produces a
/// [`CapabilityReply`]. Returning `Err` is equivalent to a `"500"` reply whose
/// payload is the error text; either way the hub receives exactly one
/// response frame, never more.
///
/// Handlers run in their own task and must not assume they block the
/// receive path; later frames may be dispatched while a handler is pending.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Fulfills a single capability request.
    async fn handle(&self, request: Envelope) -> Result<CapabilityReply>;
}

// ============================================================================
// CapabilityFn
// ============================================================================

/// Adapts an async closure to [`CapabilityHandler`].
pub struct CapabilityFn<F> {
    func: F,
}

impl<F> CapabilityFn<F> {
    /// Wraps an async closure as a capability handler.
    #[inline]
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Envelope) -> Fut + Send + Sync,
        Fut: Future<Output = Result<CapabilityReply>> + Send,
    {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> CapabilityHandler for CapabilityFn<F>
where
    F: Fn(Envelope) -> Fut + Send + Sync,
    Fut: Future<Output = Result<CapabilityReply>> + Send,
{
    async fn handle(&self, request: Envelope) -> Result<CapabilityReply> {
        (self.func)(request).await
    }
}

// ============================================================================
// CapabilityRegistry
// ============================================================================

/// Handlers keyed by capability name.
///
/// Clone-able and thread-safe; the dispatcher resolves inbound envelope
/// kinds against it on every frame, and consumers may register handlers
/// at any time, including while connected.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    handlers: Arc<RwLock<FxHashMap<String, Arc<dyn CapabilityHandler>>>>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`, replacing any previous one.
    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn CapabilityHandler>) {
        let mut handlers = self.handlers.write();
        handlers.insert(name.into(), handler);
    }

    /// Removes the handler registered under `name`.
    pub fn unregister(&self, name: &str) {
        let mut handlers = self.handlers.write();
        handlers.remove(name);
    }

    /// Looks up the handler for a capability name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityHandler>> {
        let handlers = self.handlers.read();
        handlers.get(name).map(Arc::clone)
    }

    /// Returns `true` if a handler is registered under `name`.
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.read().contains_key(name)
    }

    /// Returns the number of registered capabilities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns `true` if no capabilities are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;

    fn capture_request() -> Envelope {
        Envelope::from_frame(r#"{"type":"capture","id":"r1","sender":"ai"}"#).expect("parse")
    }

    #[test]
    fn test_reply_constructors() {
        let ok = CapabilityReply::ok("<data>");
        assert_eq!(ok.code, "200");
        assert_eq!(ok.payload, "<data>");

        let err = CapabilityReply::internal_error("boom");
        assert_eq!(err.code, "500");
        assert_eq!(err.payload, "boom");
    }

    #[test]
    fn test_registry_register_and_get() {
        let registry = CapabilityRegistry::new();
        assert!(registry.is_empty());

        let handler = Arc::new(CapabilityFn::new(|_request| async {
            Ok(CapabilityReply::ok("<data>"))
        }));
        registry.register("capture", handler);

        assert!(registry.contains("capture"));
        assert!(!registry.contains("clipboard"));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("capture").is_some());
        assert!(registry.get("clipboard").is_none());
    }

    #[test]
    fn test_registry_unregister() {
        let registry = CapabilityRegistry::new();
        registry.register(
            "capture",
            Arc::new(CapabilityFn::new(|_request| async {
                Ok(CapabilityReply::ok(""))
            })),
        );
        registry.unregister("capture");
        assert!(!registry.contains("capture"));
    }

    #[tokio::test]
    async fn test_capability_fn_invocation() {
        let handler = CapabilityFn::new(|request: Envelope| async move {
            Ok(CapabilityReply::ok(format!("echo:{}", request.id)))
        });

        let reply = handler.handle(capture_request()).await.expect("handle");
        assert_eq!(reply.code, "200");
        assert_eq!(reply.payload, "echo:r1");
    }

    #[tokio::test]
    async fn test_capability_fn_error_path() {
        let handler = CapabilityFn::new(|_request: Envelope| async {
            Err(Error::handler("capture", "no screen available"))
        });

        let err = handler.handle(capture_request()).await.unwrap_err();
        assert!(matches!(err, Error::Handler { .. }));
    }
}
