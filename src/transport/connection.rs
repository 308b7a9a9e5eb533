//! Outbound WebSocket connection and I/O loop.
//!
//! This module handles the persistent connection to the local hub,
//! including frame delivery and lifecycle event reporting.
//!
//! # I/O Loop
//!
//! Each open connection spawns a tokio task that handles:
//!
//! - Incoming text frames from the hub (forwarded to the owner)
//! - Outgoing frames queued through [`Transport::send`]
//! - Close and error detection
//!
//! All events are tagged with the transport's generation so that a
//! superseded instance can never deliver events into a newer generation's
//! state.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Stream type for the hub connection.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound instruction for the I/O loop.
#[derive(Debug)]
enum OutboundFrame {
    /// Send a text frame.
    Text(String),
    /// Close the socket and terminate the loop.
    Close,
}

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle event emitted by a transport.
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection opened; carries the live transport handle.
    Opened(Transport),
    /// A text frame arrived from the hub.
    Frame(String),
    /// The hub closed the link, or the I/O loop was shut down.
    Closed,
    /// Socket-level failure (dial, read, or write).
    Error(String),
}

/// A [`TransportEvent`] tagged with the generation that produced it.
///
/// The owner compares `generation` against its live transport and discards
/// events from superseded instances.
#[derive(Debug)]
pub struct LinkEvent {
    /// Generation of the originating transport.
    pub generation: u64,
    /// The event itself.
    pub event: TransportEvent,
}

impl LinkEvent {
    /// Creates a tagged event.
    #[inline]
    #[must_use]
    pub fn new(generation: u64, event: TransportEvent) -> Self {
        Self { generation, event }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// One outbound persistent connection to the hub endpoint.
///
/// Created by [`Transport::dial`], which resolves once the WebSocket
/// handshake completes and the internal I/O loop is running. The handle is
/// cheap to move; dropping it does not close the socket (the owner calls
/// [`Transport::close`] explicitly, or the I/O loop exits on its own when
/// the outbound channel is gone).
#[derive(Debug)]
pub struct Transport {
    /// Channel into the I/O loop.
    outbound_tx: mpsc::UnboundedSender<OutboundFrame>,
    /// Live flag, cleared by the I/O loop on exit.
    open: Arc<AtomicBool>,
    /// Generation stamped on every event this transport emits.
    generation: u64,
}

impl Transport {
    /// Dials the hub endpoint and starts the I/O loop.
    ///
    /// Events (inbound frames, close, errors) are delivered through
    /// `events`, each tagged with `generation`. The `Opened` event is not
    /// emitted here; a successful return *is* the open signal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the dial or WebSocket handshake
    /// fails.
    pub async fn dial(
        url: Url,
        generation: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Self> {
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::connection(e.to_string()))?;

        debug!(%url, generation, "hub connection established");

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));

        tokio::spawn(Self::run_io_loop(
            ws_stream,
            outbound_rx,
            Arc::clone(&open),
            generation,
            events,
        ));

        Ok(Self {
            outbound_tx,
            open,
            generation,
        })
    }

    /// Returns the generation stamped on this transport's events.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` while the underlying link is open.
    ///
    /// Reflects the live socket, not mere allocation: the flag is cleared
    /// the moment the I/O loop observes a close or error.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Queues a text frame for delivery to the hub.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the link is not open
    /// - [`Error::ConnectionClosed`] if the I/O loop has terminated
    pub fn send(&self, frame: String) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        self.outbound_tx
            .send(OutboundFrame::Text(frame))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Closes the connection.
    ///
    /// Idempotent; marks the link not-open immediately and asks the I/O
    /// loop to close the socket and terminate.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        let _ = self.outbound_tx.send(OutboundFrame::Close);
    }

    /// I/O loop pumping frames in both directions.
    ///
    /// Exits on remote close, socket error, or a local `Close` instruction,
    /// clearing the open flag and emitting one final event before
    /// terminating.
    async fn run_io_loop(
        ws_stream: WsStream,
        mut outbound_rx: mpsc::UnboundedReceiver<OutboundFrame>,
        open: Arc<AtomicBool>,
        generation: u64,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let exit = loop {
            tokio::select! {
                // Incoming frames from the hub
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(generation, len = text.len(), "frame received");
                            let _ = events.send(LinkEvent::new(
                                generation,
                                TransportEvent::Frame(text.to_string()),
                            ));
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!(generation, "hub closed the connection");
                            break TransportEvent::Closed;
                        }

                        Some(Err(e)) => {
                            warn!(generation, error = %e, "WebSocket read error");
                            break TransportEvent::Error(e.to_string());
                        }

                        None => {
                            debug!(generation, "WebSocket stream ended");
                            break TransportEvent::Closed;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Outbound frames from the owner
                frame = outbound_rx.recv() => {
                    match frame {
                        Some(OutboundFrame::Text(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(generation, error = %e, "WebSocket write error");
                                break TransportEvent::Error(e.to_string());
                            }
                        }

                        Some(OutboundFrame::Close) | None => {
                            debug!(generation, "transport shutdown requested");
                            let _ = ws_write.close().await;
                            break TransportEvent::Closed;
                        }
                    }
                }
            }
        };

        open.store(false, Ordering::SeqCst);
        let _ = events.send(LinkEvent::new(generation, exit));

        debug!(generation, "transport I/O loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
