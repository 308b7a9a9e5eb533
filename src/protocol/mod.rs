//! Hub protocol message types.
//!
//! This module defines the envelope format exchanged between the client
//! and the local hub over the WebSocket link.
//!
//! # Protocol Overview
//!
//! | Kind | Direction | Purpose |
//! |------|-----------|---------|
//! | `register` | Client → Hub | Announce endpoint after open |
//! | `heartbeat` | Client → Hub | Periodic liveness signal |
//! | `<capability>` | Hub → Client | Capability request (e.g. `capture`) |
//! | `response` | Client → Hub | Correlated capability result |
//! | other | both | Free-form application traffic, routed unchanged |
//!
//! Frames are newline-free JSON text. A `response` echoes the request's `id`
//! in its `reference` field; there is no pending-request table on either side.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | The [`Envelope`] unit and well-known kinds/codes |

// ============================================================================
// Submodules
// ============================================================================

/// Envelope message type and well-known constants.
pub mod envelope;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::{Envelope, code, kind};
