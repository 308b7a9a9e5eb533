//! Public client handle.
//!
//! [`HubClient`] is the interface the rest of the extension talks to:
//! `connect`/`disconnect`/`status`/`send` plus capability registration.
//! It is a thin clone-able front over a command channel into the client
//! actor, which owns all connection state.
//!
//! Dropping every `HubClient` clone shuts the actor down once any
//! in-flight capability handlers have finished.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::capability::{CapabilityHandler, CapabilityRegistry, CapabilityReply};
use crate::error::{Error, Result};
use crate::protocol::Envelope;

use super::actor::ClientActor;
use super::options::{ClientOptions, HubClientBuilder};
use super::state::HubEvent;

// ============================================================================
// Types
// ============================================================================

/// Consumer-facing notification stream.
///
/// Carries [`HubEvent::StatusChanged`], [`HubEvent::Message`], and
/// [`HubEvent::ParseError`] in arrival order.
pub type HubEvents = mpsc::UnboundedReceiver<HubEvent>;

// ============================================================================
// Command
// ============================================================================

/// Commands from the handle (and handler tasks) to the client actor.
pub(crate) enum Command {
    /// Establish the hub link; resolves at a terminal outcome.
    Connect {
        /// Resolved with `Ok` once Connected, `Err` if the attempt failed.
        ack: oneshot::Sender<Result<()>>,
    },
    /// Intentionally tear the link down; no reconnect follows.
    Disconnect {
        /// Resolved once teardown is complete.
        ack: oneshot::Sender<()>,
    },
    /// Query whether the underlying link is open.
    Status {
        /// Resolved with the link status.
        reply: oneshot::Sender<bool>,
    },
    /// Send an envelope verbatim over the open link.
    Send {
        /// Envelope to deliver.
        envelope: Envelope,
        /// Resolved with the synchronous send outcome.
        ack: oneshot::Sender<Result<()>>,
    },
    /// Deliver a capability handler's result (internal, from handler tasks).
    Respond {
        /// The request envelope being answered.
        request: Envelope,
        /// The handler's result.
        reply: CapabilityReply,
    },
}

// ============================================================================
// HubClient
// ============================================================================

/// Handle to the hub connection manager.
///
/// Cheap to clone; all clones address the same connection. Exactly one
/// connection (and one actor) exists per built client.
///
/// # Example
///
/// ```no_run
/// use hub_client::{Envelope, HubClient};
///
/// # async fn example() -> hub_client::Result<()> {
/// let (client, _events) = HubClient::builder().build()?;
/// client.connect().await?;
/// client.send(Envelope::hub("chrome", "hello")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HubClient {
    /// Channel into the client actor.
    command_tx: mpsc::UnboundedSender<Command>,
    /// Capability handlers, shared with the actor's dispatcher.
    registry: CapabilityRegistry,
}

impl HubClient {
    /// Returns a builder with the design defaults.
    #[inline]
    #[must_use]
    pub fn builder() -> HubClientBuilder {
        HubClientBuilder::new()
    }

    /// Starts the client actor for validated options.
    pub(crate) fn start(options: ClientOptions) -> (Self, HubEvents) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let registry = CapabilityRegistry::new();

        let actor = ClientActor::new(
            options,
            registry.clone(),
            command_rx,
            command_tx.downgrade(),
            events_tx,
        );
        tokio::spawn(actor.run());

        (
            Self {
                command_tx,
                registry,
            },
            events_rx,
        )
    }

    /// Establishes the hub link.
    ///
    /// No-op when already connected; while an attempt is in flight this
    /// joins it. Resolves `Ok(())` once the link is open and registered.
    /// If the attempt fails, resolves `Err` while reconnection continues
    /// in the background on the backoff schedule.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if this connection attempt failed
    /// - [`Error::ChannelClosed`] if the client has shut down
    pub async fn connect(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send_command(Command::Connect { ack })?;
        rx.await?
    }

    /// Tears the hub link down intentionally.
    ///
    /// Cancels any pending reconnect, stops the keepalive, and closes the
    /// transport. The cycle stays halted until [`connect`](Self::connect)
    /// is called again.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the client has shut down.
    pub async fn disconnect(&self) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send_command(Command::Disconnect { ack })?;
        rx.await?;
        Ok(())
    }

    /// Returns `true` iff a transport exists and its underlying link is
    /// open (not merely allocated while connecting).
    pub async fn status(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.send_command(Command::Status { reply }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Sends an envelope verbatim over the open link.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no link is open (no transport
    ///   activity is produced)
    /// - [`Error::Json`] if the envelope fails to serialize
    /// - [`Error::ChannelClosed`] if the client has shut down
    pub async fn send(&self, envelope: Envelope) -> Result<()> {
        let (ack, rx) = oneshot::channel();
        self.send_command(Command::Send { envelope, ack })?;
        rx.await?
    }

    /// Registers a capability handler under `name`.
    ///
    /// Inbound envelopes whose `type` equals `name` are routed to the
    /// handler; its result is returned to the hub as exactly one
    /// correlated `response` frame.
    pub fn register_capability(
        &self,
        name: impl Into<String>,
        handler: impl CapabilityHandler + 'static,
    ) {
        self.registry.register(name, Arc::new(handler));
    }

    /// Returns the capability registry.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Queues a command for the actor.
    fn send_command(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }
}
