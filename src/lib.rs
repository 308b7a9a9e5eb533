//! Hub Client - Persistent connection manager for a local automation hub.
//!
//! This library maintains a long-lived WebSocket connection from an
//! automation client (a browser extension background process, a tray
//! shell) to a local hub, and keeps it healthy without supervision.
//!
//! # Architecture
//!
//! The client follows an actor model:
//!
//! - **Handle ([`HubClient`])**: clone-able front; connect, disconnect,
//!   status, send, capability registration
//! - **Actor**: single task owning the connection state machine, the
//!   transport, the keepalive, and the reconnect backoff
//!
//! Key design principles:
//!
//! - One transport is live at any time; superseded instances are released
//!   before their events can reach newer state (generation guard)
//! - Unintentional losses heal themselves: exponential backoff, no attempt
//!   cutoff, reset on success
//! - Inbound frames dispatch in arrival order; capability handlers run in
//!   their own tasks and answer through correlated `response` envelopes
//!
//! # Quick Start
//!
//! ```no_run
//! use hub_client::{CapabilityFn, CapabilityReply, HubClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (client, mut events) = HubClient::builder()
//!         .url("ws://localhost:58080/hub")
//!         .endpoint("chrome")
//!         .build()?;
//!
//!     // Serve screen-capture requests from the hub.
//!     client.register_capability(
//!         "capture",
//!         CapabilityFn::new(|_request| async {
//!             Ok(CapabilityReply::ok("<png data url>"))
//!         }),
//!     );
//!
//!     client.connect().await?;
//!     while let Some(event) = events.recv().await {
//!         println!("hub event: {event:?}");
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capability`] | Handler trait, registry, and reply types |
//! | [`client`] | Connection state machine and [`HubClient`] handle |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Envelope wire format (internal) |
//! | [`transport`] | WebSocket transport layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Capability handlers: trait, closure adapter, registry.
///
/// Register a handler by name to serve hub-originated requests such as
/// screen capture.
pub mod capability;

/// Connection state machine and public client handle.
///
/// Use [`HubClient::builder()`] to configure and start a client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Hub protocol message types.
///
/// Internal module defining the [`Envelope`] unit and its well-known
/// kinds and status codes.
pub mod protocol;

/// WebSocket transport layer.
///
/// Internal module handling the outbound hub connection and its I/O loop.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Capability types
pub use capability::{CapabilityFn, CapabilityHandler, CapabilityRegistry, CapabilityReply};

// Client types
pub use client::{
    ConnectionState, HubClient, HubClientBuilder, HubEvent, HubEvents, ReconnectBackoff,
};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::Envelope;
