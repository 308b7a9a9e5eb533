//! WebSocket transport layer.
//!
//! This module owns the single outbound connection from the client to the
//! local hub endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  HubClient      │                              │  Hub            │
//! │  (actor task)   │         WebSocket            │  (local peer)   │
//! │                 │─────────────────────────────►│                 │
//! │  Transport      │      ws://localhost:58080    │  WebSocket      │
//! │  (I/O loop)     │◄─────────────────────────────│  Server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::open` - Dial the hub endpoint and spawn the I/O loop
//! 2. Lifecycle events flow to the owner tagged with the transport generation
//! 3. `Transport::send` - Queue an outbound text frame (fails when not open)
//! 4. `Transport::close` - Idempotent shutdown; the I/O loop terminates
//!
//! At most one transport is live at any time; a superseded instance keeps
//! emitting events under its own generation, which the owner discards.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Outbound connection, I/O loop, lifecycle events |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound WebSocket connection and I/O loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{LinkEvent, Transport, TransportEvent};
