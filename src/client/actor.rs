//! Client actor: the connection state machine.
//!
//! A single actor task owns the entire hub link: the connection state, the
//! transport slot, the keepalive interval, the reconnect timer, and the
//! backoff. Everything that mutates connection state flows through one
//! `tokio::select!` loop, so events are handled in order with no parallel
//! mutation.
//!
//! # Event Loop
//!
//! The loop multiplexes four sources:
//!
//! - Commands from [`HubClient`](super::handle::HubClient) handles
//!   (connect, disconnect, status, send) and from capability handler tasks
//!   (respond)
//! - Transport lifecycle events, tagged with a generation so a superseded
//!   transport can never act on a newer generation's state
//! - Keepalive ticks, armed only while Connected
//! - The reconnect timer, armed only while a retry is pending
//!
//! Capability handlers run in their own tasks; their results re-enter the
//! loop as respond commands, so a slow handler never blocks the receive
//! path.

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, info, trace, warn};

use crate::capability::{CapabilityHandler, CapabilityRegistry, CapabilityReply};
use crate::error::{Error, Result};
use crate::protocol::Envelope;
use crate::transport::{LinkEvent, Transport, TransportEvent};

use super::backoff::ReconnectBackoff;
use super::handle::Command;
use super::options::ClientOptions;
use super::state::{ConnectionState, HubEvent};

// ============================================================================
// ClientActor
// ============================================================================

/// The connection state machine.
///
/// Constructed by `HubClient::start` and consumed by [`run`](Self::run).
pub(crate) struct ClientActor {
    /// Validated configuration.
    options: ClientOptions,
    /// Capability handlers, shared with the public handle.
    registry: CapabilityRegistry,
    /// Current link state.
    state: ConnectionState,
    /// The live transport, if any.
    transport: Option<Transport>,
    /// Reconnect delay schedule.
    backoff: ReconnectBackoff,
    /// Generation of the current connection attempt or live transport.
    ///
    /// Bumped on every new attempt and on every teardown; link events
    /// carrying any other generation are discarded.
    generation: u64,
    /// Commands from handles and handler tasks.
    command_rx: mpsc::UnboundedReceiver<Command>,
    /// Weak command sender handed to spawned handler tasks.
    command_tx: mpsc::WeakUnboundedSender<Command>,
    /// Link events from transports and dial tasks.
    link_rx: mpsc::UnboundedReceiver<LinkEvent>,
    /// Link event sender cloned into transports and dial tasks.
    link_tx: mpsc::UnboundedSender<LinkEvent>,
    /// Consumer notification stream.
    events_tx: mpsc::UnboundedSender<HubEvent>,
    /// Heartbeat interval, armed only while Connected.
    keepalive: Option<Interval>,
    /// Pending reconnect timer, armed only between a loss and its retry.
    reconnect: Option<Pin<Box<Sleep>>>,
    /// Callers awaiting the in-flight connect attempt's terminal outcome.
    connect_waiters: Vec<oneshot::Sender<Result<()>>>,
}

// ============================================================================
// ClientActor - Construction & Loop
// ============================================================================

impl ClientActor {
    /// Creates the actor in the Disconnected state.
    pub(crate) fn new(
        options: ClientOptions,
        registry: CapabilityRegistry,
        command_rx: mpsc::UnboundedReceiver<Command>,
        command_tx: mpsc::WeakUnboundedSender<Command>,
        events_tx: mpsc::UnboundedSender<HubEvent>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::unbounded_channel();
        let backoff = ReconnectBackoff::new(options.backoff_initial, options.backoff_ceiling);

        Self {
            options,
            registry,
            state: ConnectionState::Disconnected,
            transport: None,
            backoff,
            generation: 0,
            command_rx,
            command_tx,
            link_rx,
            link_tx,
            events_tx,
            keepalive: None,
            reconnect: None,
            connect_waiters: Vec::new(),
        }
    }

    /// Runs the event loop until every client handle is dropped.
    pub(crate) async fn run(mut self) {
        debug!(url = %self.options.url, endpoint = %self.options.endpoint, "client actor started");

        loop {
            tokio::select! {
                command = self.command_rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }

                Some(link_event) = self.link_rx.recv() => {
                    self.handle_link_event(link_event);
                }

                _ = next_tick(&mut self.keepalive), if self.keepalive.is_some() => {
                    self.handle_keepalive_tick();
                }

                () = timer_elapsed(&mut self.reconnect), if self.reconnect.is_some() => {
                    self.reconnect = None;
                    debug!("reconnect timer fired");
                    self.begin_connect();
                }
            }
        }

        self.teardown();
        debug!("client actor terminated");
    }
}

// ============================================================================
// ClientActor - Commands
// ============================================================================

impl ClientActor {
    /// Handles one command from a handle or handler task.
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { ack } => self.handle_connect(ack),
            Command::Disconnect { ack } => {
                self.disconnect_intentional();
                let _ = ack.send(());
            }
            Command::Status { reply } => {
                let open = self.transport.as_ref().is_some_and(Transport::is_open);
                let _ = reply.send(open);
            }
            Command::Send { envelope, ack } => {
                let _ = ack.send(self.send_envelope(&envelope));
            }
            Command::Respond { request, reply } => self.respond(request, reply),
        }
    }

    /// Connect command: no-op when up, join when in flight, dial otherwise.
    fn handle_connect(&mut self, ack: oneshot::Sender<Result<()>>) {
        match self.state {
            ConnectionState::Connected => {
                let _ = ack.send(Ok(()));
            }
            ConnectionState::Connecting => {
                self.connect_waiters.push(ack);
            }
            ConnectionState::Disconnected => {
                // An explicit connect supersedes any pending retry timer.
                self.reconnect = None;
                self.connect_waiters.push(ack);
                self.begin_connect();
            }
        }
    }

    /// Intentional teardown: the only path that halts the reconnect cycle.
    ///
    /// Cancels the retry timer and keepalive before releasing the
    /// transport, so no further attempt can fire afterwards.
    fn disconnect_intentional(&mut self) {
        self.reconnect = None;
        self.keepalive = None;
        self.fail_connect_waiters("disconnected");

        if let Some(transport) = self.transport.take() {
            // Best effort; the hub drops us on close anyway.
            if let Ok(frame) = Envelope::unregister(self.options.endpoint.as_str()).to_frame() {
                let _ = transport.send(frame);
            }
            transport.close();
        }
        // Anything still in flight from the released transport is stale.
        self.generation += 1;

        if self.state.is_connected() {
            info!("hub link closed");
            self.emit(HubEvent::StatusChanged {
                active: false,
                error: None,
            });
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Sends an envelope over the open link.
    fn send_envelope(&self, envelope: &Envelope) -> Result<()> {
        let Some(transport) = self.transport.as_ref().filter(|t| t.is_open()) else {
            return Err(Error::NotConnected);
        };
        transport.send(envelope.to_frame()?)
    }
}

// ============================================================================
// ClientActor - Link Lifecycle
// ============================================================================

impl ClientActor {
    /// Starts a connection attempt under a fresh generation.
    fn begin_connect(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        self.state = ConnectionState::Connecting;

        let url = self.options.url.clone();
        let link_tx = self.link_tx.clone();
        debug!(%url, generation, "dialing hub");

        tokio::spawn(async move {
            match Transport::dial(url, generation, link_tx.clone()).await {
                Ok(transport) => {
                    let _ = link_tx.send(LinkEvent::new(
                        generation,
                        TransportEvent::Opened(transport),
                    ));
                }
                Err(e) => {
                    let _ = link_tx.send(LinkEvent::new(
                        generation,
                        TransportEvent::Error(e.to_string()),
                    ));
                }
            }
        });
    }

    /// Routes a link event, discarding anything from a stale generation.
    fn handle_link_event(&mut self, link_event: LinkEvent) {
        if link_event.generation != self.generation {
            // A superseded transport must not deliver into this
            // generation's state; release it if it just opened.
            if let TransportEvent::Opened(transport) = link_event.event {
                transport.close();
            }
            trace!(
                generation = link_event.generation,
                current = self.generation,
                "stale link event discarded"
            );
            return;
        }

        match link_event.event {
            TransportEvent::Opened(transport) => self.handle_opened(transport),
            TransportEvent::Frame(text) => self.dispatch_frame(&text),
            TransportEvent::Closed => self.handle_link_down("connection closed"),
            TransportEvent::Error(reason) => self.handle_link_down(&reason),
        }
    }

    /// The dial succeeded: register, start the keepalive, reset backoff.
    fn handle_opened(&mut self, transport: Transport) {
        info!(url = %self.options.url, generation = transport.generation(), "hub link established");

        let register = Envelope::register(self.options.endpoint.as_str());
        let sent = register
            .to_frame()
            .and_then(|frame| transport.send(frame));

        self.transport = Some(transport);

        if let Err(e) = sent {
            warn!(error = %e, "register frame failed");
            self.handle_link_down("register frame failed");
            return;
        }

        self.state = ConnectionState::Connected;
        self.backoff.reset();
        self.start_keepalive();
        self.resolve_connect_waiters();
        self.emit(HubEvent::up());
    }

    /// Unintentional loss: tear down and schedule exactly one retry.
    ///
    /// Shared by transport close events, transport errors, failed dials,
    /// and heartbeat-detected dead links.
    fn handle_link_down(&mut self, reason: &str) {
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.keepalive = None;
        // Straggler events from the dead transport are now stale.
        self.generation += 1;

        let was_connecting = self.state == ConnectionState::Connecting;
        self.state = ConnectionState::Disconnected;
        if was_connecting {
            self.fail_connect_waiters(reason);
        }
        self.emit(HubEvent::down(reason));

        // Cancel-and-replace: at most one retry timer is ever pending.
        let delay = self.backoff.next_delay();
        info!(?delay, reason, "scheduling reconnect");
        self.reconnect = Some(Box::pin(tokio::time::sleep(delay)));
    }

    /// Arms the heartbeat interval.
    fn start_keepalive(&mut self) {
        let period = self.options.keepalive_period;
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.keepalive = Some(interval);
    }

    /// Heartbeat tick: send, or treat a dead link as a transport error.
    fn handle_keepalive_tick(&mut self) {
        let heartbeat = Envelope::heartbeat(self.options.endpoint.as_str());
        match self.send_envelope(&heartbeat) {
            Ok(()) => trace!("heartbeat sent"),
            Err(e) => {
                // A close event may never arrive for a link that died
                // underneath us; the send failure is the detection.
                warn!(error = %e, "heartbeat failed, link presumed dead");
                self.handle_link_down("heartbeat failed");
            }
        }
    }

    /// Final cleanup when every handle is gone.
    fn teardown(&mut self) {
        self.reconnect = None;
        self.keepalive = None;
        if let Some(transport) = self.transport.take() {
            transport.close();
        }
        self.state = ConnectionState::Disconnected;
    }
}

// ============================================================================
// ClientActor - Dispatch & Correlation
// ============================================================================

impl ClientActor {
    /// Dispatches one inbound frame.
    ///
    /// Parse failures are reported to the consumer and leave the
    /// connection untouched. Capability kinds go to their handler;
    /// everything else is forwarded unchanged.
    fn dispatch_frame(&mut self, frame: &str) {
        let envelope = match Envelope::from_frame(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "discarding malformed frame");
                self.emit(HubEvent::ParseError {
                    message: e.to_string(),
                });
                return;
            }
        };

        match self.registry.get(&envelope.kind) {
            Some(handler) => self.invoke_capability(handler, envelope),
            None => self.emit(HubEvent::Message(envelope)),
        }
    }

    /// Runs a capability handler in its own task.
    ///
    /// The result re-enters the loop as a respond command; a handler error
    /// becomes a `"500"` reply carrying the error text. Exactly one
    /// response is attempted per request either way.
    fn invoke_capability(&self, handler: Arc<dyn CapabilityHandler>, request: Envelope) {
        let Some(command_tx) = self.command_tx.upgrade() else {
            // Every handle is gone; the actor is about to shut down.
            return;
        };

        let capability = request.kind.clone();
        trace!(capability = %capability, id = %request.id, "capability request");

        tokio::spawn(async move {
            let reply = match handler.handle(request.clone()).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(capability = %capability, error = %e, "capability handler failed");
                    CapabilityReply::internal_error(e.to_string())
                }
            };
            let _ = command_tx.send(Command::Respond { request, reply });
        });
    }

    /// Correlator: answer `request` with the handler's result.
    ///
    /// A response that cannot be delivered is dropped and logged; the
    /// remote side owns the timeout.
    fn respond(&mut self, request: Envelope, reply: CapabilityReply) {
        let response = Envelope::response_to(
            &request,
            self.options.endpoint.as_str(),
            reply.code,
            reply.payload,
        );

        match self.deliver_response(&response) {
            Ok(()) => {
                trace!(reference = %response.reference, code = %response.code, "response sent");
            }
            Err(e) => {
                warn!(reference = %response.reference, error = %e, "response dropped");
            }
        }
    }

    /// Attempts delivery of a response envelope over the current link.
    fn deliver_response(&self, response: &Envelope) -> Result<()> {
        let Some(transport) = self.transport.as_ref().filter(|t| t.is_open()) else {
            return Err(Error::delivery("link is down"));
        };
        let frame = response.to_frame()?;
        transport
            .send(frame)
            .map_err(|e| Error::delivery(e.to_string()))
    }
}

// ============================================================================
// ClientActor - Notifications
// ============================================================================

impl ClientActor {
    /// Pushes an event to the consumer stream.
    fn emit(&self, event: HubEvent) {
        let _ = self.events_tx.send(event);
    }

    /// Resolves every pending connect waiter with success.
    fn resolve_connect_waiters(&mut self) {
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Ok(()));
        }
    }

    /// Resolves every pending connect waiter with a failure.
    fn fail_connect_waiters(&mut self, reason: &str) {
        for waiter in self.connect_waiters.drain(..) {
            let _ = waiter.send(Err(Error::connection(reason)));
        }
    }
}

// ============================================================================
// Timer Helpers
// ============================================================================

/// Resolves on the next keepalive tick; pends forever while disarmed.
async fn next_tick(keepalive: &mut Option<Interval>) {
    match keepalive {
        Some(interval) => {
            interval.tick().await;
        }
        None => future::pending().await,
    }
}

/// Resolves when the armed reconnect timer elapses; pends while disarmed.
async fn timer_elapsed(reconnect: &mut Option<Pin<Box<Sleep>>>) {
    match reconnect {
        Some(sleep) => sleep.as_mut().await,
        None => future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::timeout;
    use tokio_tungstenite::WebSocketStream;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_test::assert_ok;

    use crate::HubClient;
    use crate::capability::{CapabilityFn, CapabilityReply};
    use crate::client::handle::HubEvents;
    use crate::client::state::HubEvent;
    use crate::error::Error;
    use crate::protocol::Envelope;

    const WAIT: Duration = Duration::from_secs(5);

    fn init_tracing() {
        use tracing_subscriber::EnvFilter;
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn bind_hub() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}/hub", listener.local_addr().expect("addr"));
        (listener, url)
    }

    async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
        let (stream, _) = timeout(WAIT, listener.accept())
            .await
            .expect("accept wait")
            .expect("accept");
        tokio_tungstenite::accept_async(stream).await.expect("upgrade")
    }

    async fn recv_frame(ws: &mut WebSocketStream<TcpStream>) -> String {
        loop {
            let message = timeout(WAIT, ws.next())
                .await
                .expect("frame wait")
                .expect("stream open")
                .expect("frame");
            if let Message::Text(text) = message {
                return text.to_string();
            }
        }
    }

    async fn recv_event(events: &mut HubEvents) -> HubEvent {
        timeout(WAIT, events.recv())
            .await
            .expect("event wait")
            .expect("events open")
    }

    /// Drains status notifications until the link comes up.
    async fn wait_for_up(events: &mut HubEvents) {
        loop {
            match recv_event(events).await {
                HubEvent::StatusChanged { active: true, .. } => return,
                HubEvent::StatusChanged { active: false, .. } => {}
                other => panic!("unexpected event while waiting for up: {other:?}"),
            }
        }
    }

    fn test_client(url: &str) -> (HubClient, HubEvents) {
        HubClient::builder()
            .url(url)
            .endpoint("chrome")
            // Long enough to stay out of the way of non-heartbeat tests.
            .keepalive_period(Duration::from_secs(30))
            .backoff(Duration::from_millis(50), Duration::from_millis(200))
            .build()
            .expect("build")
    }

    const REGISTER_FRAME: &str = r#"{"type":"register","sender":"chrome"}"#;

    #[tokio::test]
    async fn test_connect_registers_and_reports_up() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let register = recv_frame(&mut ws).await;
            (register, ws)
        });

        client.connect().await.expect("connect");
        assert!(client.status().await);
        assert_eq!(recv_event(&mut events).await, HubEvent::up());

        let (register, _ws) = server.await.expect("server");
        assert_eq!(register, REGISTER_FRAME);
    }

    #[tokio::test]
    async fn test_connect_twice_is_noop() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let register = recv_frame(&mut ws).await;
            // No second register may arrive.
            let extra = timeout(Duration::from_millis(200), ws.next()).await;
            (register, extra.is_err(), ws)
        });

        tokio_test::assert_ok!(client.connect().await);
        tokio_test::assert_ok!(client.connect().await, "second connect is a no-op");
        wait_for_up(&mut events).await;

        let (register, no_extra_frame, _ws) = server.await.expect("server");
        assert_eq!(register, REGISTER_FRAME);
        assert!(no_extra_frame, "a second register frame was sent");
    }

    #[tokio::test]
    async fn test_send_while_disconnected_fails() {
        init_tracing();
        let (_listener, url) = bind_hub().await;
        let (client, _events) = test_client(&url);

        assert!(!client.status().await);
        let err = client
            .send(Envelope::hub("chrome", "ping"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_send_delivers_verbatim_envelope() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            let frame = recv_frame(&mut ws).await;
            (frame, ws)
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;

        let outbound = Envelope::request("chrome", "ai", "ask", "what is on screen?");
        tokio_test::assert_ok!(client.send(outbound.clone()).await);

        let (frame, _ws) = server.await.expect("server");
        assert_eq!(Envelope::from_frame(&frame).expect("parse"), outbound);
    }

    #[tokio::test]
    async fn test_capability_round_trip() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        client.register_capability(
            "capture",
            CapabilityFn::new(|_request: Envelope| async {
                Ok(CapabilityReply::ok("<data>"))
            }),
        );

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            ws.send(Message::Text(
                r#"{"type":"capture","id":"r1","sender":"ai"}"#.into(),
            ))
            .await
            .expect("send request");
            let response = recv_frame(&mut ws).await;
            // Exactly one response per request.
            let extra = timeout(Duration::from_millis(200), ws.next()).await;
            (response, extra.is_err(), ws)
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;

        let (response, no_extra_frame, _ws) = server.await.expect("server");
        let envelope = Envelope::from_frame(&response).expect("parse");
        assert_eq!(envelope.kind, "response");
        assert_eq!(envelope.reference, "r1");
        assert_eq!(envelope.sender, "chrome");
        assert_eq!(envelope.recipient, "ai");
        assert_eq!(envelope.code, "200");
        assert_eq!(envelope.payload, "<data>");
        assert!(no_extra_frame, "more than one response frame was sent");
    }

    #[tokio::test]
    async fn test_handler_failure_becomes_500_response() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        client.register_capability(
            "capture",
            CapabilityFn::new(|_request: Envelope| async {
                Err(Error::handler("capture", "no screen available"))
            }),
        );

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            ws.send(Message::Text(
                r#"{"type":"capture","id":"r2","sender":"ai"}"#.into(),
            ))
            .await
            .expect("send request");
            let response = recv_frame(&mut ws).await;
            (response, ws)
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;

        let (response, _ws) = server.await.expect("server");
        let envelope = Envelope::from_frame(&response).expect("parse");
        assert_eq!(envelope.kind, "response");
        assert_eq!(envelope.reference, "r2");
        assert_eq!(envelope.code, "500");
        assert!(envelope.payload.contains("no screen available"));
    }

    #[tokio::test]
    async fn test_unregistered_kind_forwarded_to_consumer() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            ws.send(Message::Text(
                r#"{"type":"notice","sender":"ai","payload":"hello"}"#.into(),
            ))
            .await
            .expect("send");
            ws
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;
        let _ws = server.await.expect("server");

        match recv_event(&mut events).await {
            HubEvent::Message(envelope) => {
                assert_eq!(envelope.kind, "notice");
                assert_eq!(envelope.sender, "ai");
                assert_eq!(envelope.payload, "hello");
            }
            other => panic!("expected forwarded message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_frame_reports_parse_error_once() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            ws.send(Message::Text("this is not an envelope".into()))
                .await
                .expect("send garbage");
            ws.send(Message::Text(r#"{"type":"notice","sender":"ai"}"#.into()))
                .await
                .expect("send valid");
            ws
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;
        let _ws = server.await.expect("server");

        match recv_event(&mut events).await {
            HubEvent::ParseError { .. } => {}
            other => panic!("expected parse error, got {other:?}"),
        }

        // The connection survived: the next valid frame still arrives.
        match recv_event(&mut events).await {
            HubEvent::Message(envelope) => assert_eq!(envelope.kind, "notice"),
            other => panic!("expected forwarded message, got {other:?}"),
        }
        assert!(client.status().await);
    }

    #[tokio::test]
    async fn test_unintentional_close_reconnects() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let first = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            (listener, ws)
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;
        let (listener, ws) = first.await.expect("server");

        // Hub goes away without warning.
        drop(ws);
        match recv_event(&mut events).await {
            HubEvent::StatusChanged {
                active: false,
                error: Some(_),
            } => {}
            other => panic!("expected link-down, got {other:?}"),
        }

        // The client retries on its own after the initial backoff delay.
        let mut ws = accept_ws(&listener).await;
        let register = recv_frame(&mut ws).await;
        assert_eq!(register, REGISTER_FRAME);
        wait_for_up(&mut events).await;
        assert!(client.status().await);
    }

    #[tokio::test]
    async fn test_intentional_disconnect_halts_cycle() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            (listener, ws)
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;
        let (listener, mut ws) = server.await.expect("server");

        client.disconnect().await.expect("disconnect");
        assert!(!client.status().await);
        assert_eq!(
            recv_frame(&mut ws).await,
            r#"{"type":"unregister","sender":"chrome"}"#
        );
        match recv_event(&mut events).await {
            HubEvent::StatusChanged {
                active: false,
                error: None,
            } => {}
            other => panic!("expected intentional link-down, got {other:?}"),
        }

        // Well past the backoff floor: no reconnect may be attempted.
        let attempt = timeout(Duration::from_millis(300), listener.accept()).await;
        assert!(attempt.is_err(), "reconnect fired after intentional disconnect");

        // The cycle resumes only on an explicit connect.
        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let register = recv_frame(&mut ws).await;
            (register, ws)
        });
        client.connect().await.expect("reconnect");
        let (register, _ws) = server.await.expect("server");
        assert_eq!(register, REGISTER_FRAME);
    }

    #[tokio::test]
    async fn test_failed_connect_returns_error_then_retries() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let (client, mut events) = test_client(&url);

        let err = client.connect().await.unwrap_err();
        assert!(err.is_connection_error());
        match recv_event(&mut events).await {
            HubEvent::StatusChanged {
                active: false,
                error: Some(_),
            } => {}
            other => panic!("expected link-down, got {other:?}"),
        }

        // Once the hub is back, the background retry cycle finds it.
        let listener = TcpListener::bind(addr).await.expect("rebind");
        let mut ws = accept_ws(&listener).await;
        let register = recv_frame(&mut ws).await;
        assert_eq!(register, REGISTER_FRAME);
        wait_for_up(&mut events).await;
        assert!(client.status().await);
    }

    #[tokio::test]
    async fn test_heartbeat_sent_while_connected() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = HubClient::builder()
            .url(&url)
            .endpoint("chrome")
            .keepalive_period(Duration::from_millis(50))
            .backoff(Duration::from_millis(50), Duration::from_millis(200))
            .build()
            .expect("build");

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let register = recv_frame(&mut ws).await;
            let heartbeat = recv_frame(&mut ws).await;
            (register, heartbeat, ws)
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;

        let (register, heartbeat, _ws) = server.await.expect("server");
        assert_eq!(register, REGISTER_FRAME);
        assert_eq!(heartbeat, r#"{"type":"heartbeat","sender":"chrome"}"#);
    }

    #[tokio::test]
    async fn test_response_dropped_when_link_is_down() {
        init_tracing();
        let (listener, url) = bind_hub().await;
        let (client, mut events) = test_client(&url);

        client.register_capability(
            "capture",
            CapabilityFn::new(|_request: Envelope| async {
                // Outlive the connection.
                tokio::time::sleep(Duration::from_millis(150)).await;
                Ok(CapabilityReply::ok("<late data>"))
            }),
        );

        let server = tokio::spawn(async move {
            let mut ws = accept_ws(&listener).await;
            let _register = recv_frame(&mut ws).await;
            ws.send(Message::Text(
                r#"{"type":"capture","id":"r9","sender":"ai"}"#.into(),
            ))
            .await
            .expect("send request");
            // Drop both the socket and the listener so the late reply has
            // nowhere to go and no reconnect can succeed.
        });

        client.connect().await.expect("connect");
        wait_for_up(&mut events).await;
        server.await.expect("server");

        match recv_event(&mut events).await {
            HubEvent::StatusChanged { active: false, .. } => {}
            other => panic!("expected link-down, got {other:?}"),
        }

        // The handler completes while the link is down; the response is
        // logged and dropped, and the client stays healthy.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!client.status().await);
        client.disconnect().await.expect("halt retry cycle");
    }
}
