//! Connection state machine for the bridge socket.
//!
//! [`TransportClient`] owns the connection lifecycle, the reconnect backoff,
//! the outbound queue and inbound decoding. It performs no I/O itself: it
//! drives a [`Socket`] and a [`Scheduler`], and is told about their outcomes
//! through [`TransportClient::handle_open`], [`TransportClient::handle_frame`],
//! [`TransportClient::handle_close`] and [`TransportClient::handle_timer`].
//! The tokio driver lives in [`crate::bridge`]; tests use [`crate::mock`].
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open──▶ Open
//!                      │                   │
//!                      └──── closed ───────┤
//!                                          ▼
//!            Failed ◀── exhausted ── Reconnecting ──timer──▶ Connecting
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use cosmoid_types::{ConnectionState, Device, Inbound, Outbound};

use crate::error::{ErrorKind, ProtocolError, TransportError};
use crate::events::{ClientEvent, DisconnectReason, ListenerRegistry};
use crate::reconnect::ClientConfig;

/// A single outbound text connection.
///
/// Completion of `open` is reported asynchronously through
/// [`TransportClient::handle_open`] or [`TransportClient::handle_close`].
pub trait Socket {
    /// Begin opening a connection to `url`, replacing any previous one.
    fn open(&mut self, url: &str) -> Result<(), TransportError>;
    /// Write one text frame on the current connection.
    fn send_text(&mut self, frame: &str) -> Result<(), TransportError>;
    /// Close the current connection, if any.
    fn close(&mut self);
}

/// Identifies a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Fires a reconnect attempt.
    Reconnect,
    /// Abandons a socket that never opened.
    ConnectTimeout,
}

/// One-shot timers. Expiry is reported through [`TransportClient::handle_timer`].
pub trait Scheduler {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// Decode one inbound text frame.
///
/// The `type` field is checked before the body so that unknown types and
/// malformed known types are reported differently.
pub fn decode_frame(text: &str) -> Result<Inbound, ProtocolError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;

    match value.get("type").and_then(Value::as_str) {
        None => return Err(ProtocolError::MissingType),
        Some(kind) if !Inbound::KINDS.contains(&kind) => {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }
        Some(_) => {}
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Bridge client state machine.
pub struct TransportClient<S, T> {
    config: ClientConfig,
    socket: S,
    scheduler: T,
    events: ListenerRegistry<ClientEvent>,
    state: ConnectionState,
    auto_reconnect: bool,
    /// Consecutive unexpected closures since the last successful open.
    failures: u32,
    queue: VecDeque<String>,
    roster: Option<Vec<Device>>,
    reconnect_timer: Option<TimerId>,
    connect_timer: Option<TimerId>,
}

impl<S, T> std::fmt::Debug for TransportClient<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportClient")
            .field("url", &self.config.url)
            .field("state", &self.state)
            .field("failures", &self.failures)
            .field("queued", &self.queue.len())
            .finish()
    }
}

impl<S: Socket, T: Scheduler> TransportClient<S, T> {
    /// Create an idle client with its own listener registry.
    pub fn new(config: ClientConfig, socket: S, scheduler: T) -> Self {
        Self::with_events(config, socket, scheduler, ListenerRegistry::new())
    }

    /// Create an idle client that publishes into an existing registry.
    pub fn with_events(
        config: ClientConfig,
        socket: S,
        scheduler: T,
        events: ListenerRegistry<ClientEvent>,
    ) -> Self {
        let auto_reconnect = config.auto_reconnect;
        Self {
            config,
            socket,
            scheduler,
            events,
            state: ConnectionState::Idle,
            auto_reconnect,
            failures: 0,
            queue: VecDeque::new(),
            roster: None,
            reconnect_timer: None,
            connect_timer: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The roster from the most recent `devicesList`, if one has arrived.
    pub fn roster(&self) -> Option<&[Device]> {
        self.roster.as_deref()
    }

    /// Frames waiting for the connection to open.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Consecutive failures counted toward `max_attempts`.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The registry notifications are published to.
    pub fn events(&self) -> &ListenerRegistry<ClientEvent> {
        &self.events
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn scheduler(&self) -> &T {
        &self.scheduler
    }

    /// Take the socket and scheduler back, e.g. to await their tasks.
    pub fn into_parts(self) -> (S, T) {
        (self.socket, self.scheduler)
    }

    /// Open the connection. No-op while `Connecting` or `Open`.
    ///
    /// Re-enables automatic reconnection. After `Failed` the failure
    /// counter starts again from zero.
    pub fn connect(&mut self) {
        if self.state.is_active() {
            debug!(state = %self.state, "connect() ignored, already active");
            return;
        }

        if self.state == ConnectionState::Failed {
            self.failures = 0;
        }
        self.auto_reconnect = self.config.auto_reconnect;
        self.cancel_timer(TimerKind::Reconnect);
        self.open_socket();
    }

    /// Close the connection and stop reconnecting. Safe to call repeatedly.
    ///
    /// Queued frames are kept and flushed by the next successful open.
    pub fn disconnect(&mut self) {
        self.auto_reconnect = false;
        self.cancel_timer(TimerKind::Reconnect);
        self.cancel_timer(TimerKind::ConnectTimeout);

        if self.state == ConnectionState::Closed {
            return;
        }
        if self.state.is_active() {
            self.socket.close();
        }
        self.roster = None;
        self.transition(ConnectionState::Closed);
        self.events.notify(&ClientEvent::Disconnected {
            reason: DisconnectReason::UserRequested,
        });
    }

    /// Send a request now if `Open`, otherwise queue it.
    pub fn send(&mut self, message: &Outbound) {
        let frame = match serde_json::to_string(message) {
            Ok(frame) => frame,
            Err(e) => {
                self.report(ErrorKind::Protocol, format!("Failed to encode {}: {e}", message.kind()));
                return;
            }
        };

        self.queue.push_back(frame);
        if self.state == ConnectionState::Open {
            self.flush();
        } else {
            trace!(kind = message.kind(), queued = self.queue.len(), "Queued outbound message");
        }
    }

    /// The socket finished opening.
    pub fn handle_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            debug!(state = %self.state, "Ignoring open outside Connecting");
            return;
        }

        self.cancel_timer(TimerKind::ConnectTimeout);
        self.failures = 0;
        self.transition(ConnectionState::Open);
        self.flush();
        self.events.notify(&ClientEvent::Connected);
        self.send(&Outbound::GetDevices);
    }

    /// A text frame arrived.
    pub fn handle_frame(&mut self, text: &str) {
        if self.state != ConnectionState::Open {
            debug!(state = %self.state, "Dropping frame received outside Open");
            return;
        }

        match decode_frame(text) {
            Ok(inbound) => {
                trace!(kind = inbound.kind(), "Received frame");
                if let Inbound::DevicesList { devices } = &inbound {
                    self.roster = Some(devices.clone());
                }
                self.events.notify(&ClientEvent::Message(inbound));
            }
            Err(e) => {
                warn!(error = %e, "Discarding inbound frame");
                self.events.notify(&ClientEvent::Error {
                    kind: ErrorKind::Protocol,
                    message: e.to_string(),
                });
            }
        }
    }

    /// The socket closed, or failed to open.
    pub fn handle_close(&mut self, reason: &str) {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => {
                self.lost(TransportError::Closed(reason.to_string()));
            }
            state => debug!(%state, reason, "Ignoring close"),
        }
    }

    /// A timer scheduled by this client fired. Unknown ids are ignored.
    pub fn handle_timer(&mut self, id: TimerId) {
        if self.reconnect_timer == Some(id) {
            self.reconnect_timer = None;
            if self.state == ConnectionState::Reconnecting {
                info!(attempt = self.failures, "Reconnecting to Cosmoid Bridge");
                self.open_socket();
            }
        } else if self.connect_timer == Some(id) {
            self.connect_timer = None;
            if self.state == ConnectionState::Connecting {
                self.socket.close();
                self.lost(TransportError::Timeout(self.config.reconnect.connect_timeout));
            }
        } else {
            trace!(?id, "Ignoring stale timer");
        }
    }

    fn open_socket(&mut self) {
        self.transition(ConnectionState::Connecting);
        info!(url = %self.config.url, "Connecting to Cosmoid Bridge");

        match self.socket.open(&self.config.url) {
            Ok(()) => {
                let timeout = self.config.reconnect.connect_timeout;
                self.connect_timer = Some(self.scheduler.schedule(TimerKind::ConnectTimeout, timeout));
            }
            Err(e) => self.lost(e),
        }
    }

    /// An unexpected closure, a failed open or a connect timeout.
    fn lost(&mut self, cause: TransportError) {
        self.cancel_timer(TimerKind::ConnectTimeout);
        let was_open = self.state == ConnectionState::Open;
        // The roster only describes the bridge session that just ended.
        self.roster = None;
        let lost = ClientEvent::Disconnected {
            reason: DisconnectReason::ConnectionLost(cause.to_string()),
        };

        if !self.auto_reconnect {
            self.transition(ConnectionState::Closed);
            if was_open {
                self.events.notify(&lost);
            }
            return;
        }

        self.failures += 1;
        let max_attempts = self.config.reconnect.max_attempts;
        warn!(
            error = %cause,
            attempt = self.failures,
            max_attempts,
            "Bridge connection failed"
        );

        if self.failures >= max_attempts {
            self.transition(ConnectionState::Failed);
            if was_open {
                self.events.notify(&lost);
            }
            let reason = format!(
                "Unable to reach Cosmoid Bridge at {} after {} attempts: {cause}",
                self.config.url, self.failures
            );
            self.events.notify(&ClientEvent::ConnectionFailed { reason });
            return;
        }

        self.transition(ConnectionState::Reconnecting);
        if was_open {
            self.events.notify(&lost);
        }
        let delay = self.config.reconnect.delay_for_attempt(self.failures);
        self.reconnect_timer = Some(self.scheduler.schedule(TimerKind::Reconnect, delay));
        info!(
            attempt = self.failures,
            delay_ms = delay.as_millis() as u64,
            "Scheduled reconnect"
        );
        self.events.notify(&ClientEvent::ReconnectScheduled {
            attempt: self.failures,
            delay,
        });
    }

    fn flush(&mut self) {
        while let Some(frame) = self.queue.pop_front() {
            if let Err(e) = self.socket.send_text(&frame) {
                self.queue.push_front(frame);
                self.report(ErrorKind::Transport, e.to_string());
                break;
            }
        }
    }

    fn cancel_timer(&mut self, kind: TimerKind) {
        let slot = match kind {
            TimerKind::Reconnect => &mut self.reconnect_timer,
            TimerKind::ConnectTimeout => &mut self.connect_timer,
        };
        if let Some(id) = slot.take() {
            self.scheduler.cancel(id);
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        let from = self.state;
        if from == to {
            return;
        }
        if !from.can_transition_to(to) {
            warn!(%from, %to, "Rejected illegal state transition");
            return;
        }
        self.state = to;
        info!(%from, %to, "Connection state changed");
        self.events.notify(&ClientEvent::StateChanged { from, to });
    }

    fn report(&self, kind: ErrorKind, message: String) {
        warn!(%kind, %message, "Transport client error");
        self.events.notify(&ClientEvent::Error { kind, message });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::commands::{encode_connect, encode_set_color};
    use crate::mock::{ManualScheduler, MockSocket};
    use crate::reconnect::ReconnectOptions;

    type Client = TransportClient<MockSocket, ManualScheduler>;

    fn client_with(config: ClientConfig) -> (Client, MockSocket, ManualScheduler, Arc<Mutex<Vec<ClientEvent>>>) {
        let socket = MockSocket::new();
        let scheduler = ManualScheduler::new();
        let client = TransportClient::new(config, socket.clone(), scheduler.clone());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        client
            .events()
            .subscribe(move |event: &ClientEvent| sink.lock().unwrap().push(event.clone()));
        (client, socket, scheduler, events)
    }

    fn client() -> (Client, MockSocket, ManualScheduler, Arc<Mutex<Vec<ClientEvent>>>) {
        client_with(ClientConfig::default())
    }

    fn count(events: &Mutex<Vec<ClientEvent>>, pred: impl Fn(&ClientEvent) -> bool) -> usize {
        events.lock().unwrap().iter().filter(|e| pred(e)).count()
    }

    #[test]
    fn test_connect_opens_and_enumerates_once() {
        let (mut client, socket, _scheduler, events) = client();
        assert_eq!(client.state(), ConnectionState::Idle);

        client.connect();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(socket.opened(), vec!["ws://localhost:8080".to_string()]);

        client.handle_open();
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(socket.sent(), vec![r#"{"type":"getDevices"}"#.to_string()]);
        assert_eq!(count(&events, |e| *e == ClientEvent::Connected), 1);

        let states: Vec<_> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ClientEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![ConnectionState::Connecting, ConnectionState::Open]);
    }

    #[test]
    fn test_connect_is_idempotent_while_active() {
        let (mut client, socket, _scheduler, _events) = client();
        client.connect();
        client.connect();
        client.handle_open();
        client.connect();
        assert_eq!(socket.opened().len(), 1);
    }

    #[test]
    fn test_queue_flushes_in_order_before_enumeration() {
        let (mut client, socket, _scheduler, _events) = client();
        let first = encode_connect("a").unwrap();
        let second = encode_set_color("a", 1, 2, 3).unwrap();

        client.send(&first);
        client.send(&second);
        assert_eq!(client.queued(), 2);
        assert!(socket.sent().is_empty());

        client.connect();
        client.handle_open();

        assert_eq!(
            socket.sent(),
            vec![
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap(),
                r#"{"type":"getDevices"}"#.to_string(),
            ]
        );
        assert_eq!(client.queued(), 0);
    }

    #[test]
    fn test_send_while_open_is_immediate() {
        let (mut client, socket, _scheduler, _events) = client();
        client.connect();
        client.handle_open();
        client.send(&encode_connect("a").unwrap());
        assert_eq!(socket.sent().len(), 2);
        assert_eq!(client.queued(), 0);
    }

    #[test]
    fn test_failed_send_keeps_frame_queued() {
        let (mut client, socket, _scheduler, events) = client();
        client.connect();
        client.handle_open();

        socket.fail_sends(true);
        client.send(&encode_connect("a").unwrap());
        assert_eq!(client.queued(), 1);
        assert_eq!(
            count(&events, |e| matches!(e, ClientEvent::Error { kind: ErrorKind::Transport, .. })),
            1
        );

        socket.fail_sends(false);
        client.send(&encode_connect("b").unwrap());
        let sent = socket.sent();
        assert!(sent[1].contains(r#""deviceId":"a""#));
        assert!(sent[2].contains(r#""deviceId":"b""#));
    }

    #[test]
    fn test_unexpected_close_schedules_linear_backoff() {
        let (mut client, socket, scheduler, events) = client();
        client.connect();
        client.handle_open();

        client.handle_close("reset by peer");
        assert_eq!(client.state(), ConnectionState::Reconnecting);
        assert_eq!(
            scheduler.pending_delay(TimerKind::Reconnect),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            count(&events, |e| matches!(
                e,
                ClientEvent::Disconnected { reason: DisconnectReason::ConnectionLost(_) }
            )),
            1
        );

        let timer = scheduler.take(TimerKind::Reconnect).unwrap();
        client.handle_timer(timer);
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(socket.opened().len(), 2);

        client.handle_close("refused");
        assert_eq!(
            scheduler.pending_delay(TimerKind::Reconnect),
            Some(Duration::from_secs(4))
        );
    }

    #[test]
    fn test_exhausted_attempts_fail_once() {
        let config = ClientConfig::default().reconnect(ReconnectOptions::new().max_attempts(3));
        let (mut client, socket, scheduler, events) = client_with(config);

        client.connect();
        for _ in 0..2 {
            client.handle_close("refused");
            assert_eq!(client.state(), ConnectionState::Reconnecting);
            let timer = scheduler.take(TimerKind::Reconnect).unwrap();
            client.handle_timer(timer);
        }
        client.handle_close("refused");

        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(socket.opened().len(), 3);
        assert_eq!(
            count(&events, |e| matches!(e, ClientEvent::ConnectionFailed { .. })),
            1
        );
        assert!(scheduler.take(TimerKind::Reconnect).is_none());

        // Nothing automatic happens afterwards.
        client.handle_close("late");
        assert_eq!(socket.opened().len(), 3);
        assert_eq!(
            count(&events, |e| matches!(e, ClientEvent::ConnectionFailed { .. })),
            1
        );
    }

    #[test]
    fn test_manual_connect_after_failure_resets_counter() {
        let config = ClientConfig::default().reconnect(ReconnectOptions::new().max_attempts(1));
        let (mut client, socket, scheduler, _events) = client_with(config);

        client.connect();
        client.handle_close("refused");
        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(client.failures(), 1);

        client.connect();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(client.failures(), 0);
        assert_eq!(socket.opened().len(), 2);

        client.handle_open();
        assert_eq!(client.state(), ConnectionState::Open);
        assert!(scheduler.take(TimerKind::Reconnect).is_none());
    }

    #[test]
    fn test_open_resets_failures() {
        let (mut client, _socket, scheduler, _events) = client();
        client.connect();
        client.handle_close("refused");
        client.handle_timer(scheduler.take(TimerKind::Reconnect).unwrap());
        assert_eq!(client.failures(), 1);

        client.handle_open();
        assert_eq!(client.failures(), 0);
    }

    #[test]
    fn test_failed_open_counts_as_failure() {
        let (mut client, socket, _scheduler, _events) = client();
        socket.fail_opens(true);
        client.connect();
        assert_eq!(client.state(), ConnectionState::Reconnecting);
        assert_eq!(client.failures(), 1);
    }

    #[test]
    fn test_disconnect_cancels_reconnect_and_is_idempotent() {
        let (mut client, socket, scheduler, events) = client();
        client.connect();
        client.handle_open();
        client.handle_close("reset");
        let timer = scheduler.peek(TimerKind::Reconnect).unwrap();

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(scheduler.cancelled().contains(&timer));

        // The cancelled timer must not revive the client.
        client.handle_timer(timer);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(socket.opened().len(), 1);

        let before = events.lock().unwrap().len();
        client.disconnect();
        client.disconnect();
        assert_eq!(events.lock().unwrap().len(), before);
    }

    #[test]
    fn test_disconnect_from_open_closes_socket() {
        let (mut client, socket, _scheduler, events) = client();
        client.connect();
        client.handle_open();
        client.disconnect();

        assert_eq!(socket.closes(), 1);
        assert_eq!(
            count(&events, |e| matches!(
                e,
                ClientEvent::Disconnected { reason: DisconnectReason::UserRequested }
            )),
            1
        );

        // A close arriving after disconnect is not a failure.
        client.handle_close("closed");
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.failures(), 0);
    }

    #[test]
    fn test_queue_survives_disconnect() {
        let (mut client, socket, _scheduler, _events) = client();
        client.send(&encode_connect("a").unwrap());
        client.disconnect();
        assert_eq!(client.queued(), 1);

        client.connect();
        client.handle_open();
        assert!(socket.sent()[0].contains(r#""type":"connect""#));
    }

    #[test]
    fn test_no_auto_reconnect_goes_to_closed() {
        let config = ClientConfig::default().auto_reconnect(false);
        let (mut client, _socket, scheduler, _events) = client_with(config);
        client.connect();
        client.handle_open();
        client.handle_close("reset");

        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(scheduler.take(TimerKind::Reconnect).is_none());
    }

    #[test]
    fn test_connect_timeout_feeds_backoff() {
        let (mut client, socket, scheduler, events) = client();
        client.connect();
        assert_eq!(
            scheduler.pending_delay(TimerKind::ConnectTimeout),
            Some(Duration::from_secs(3))
        );

        let timer = scheduler.take(TimerKind::ConnectTimeout).unwrap();
        client.handle_timer(timer);

        assert_eq!(socket.closes(), 1);
        assert_eq!(client.state(), ConnectionState::Reconnecting);
        assert_eq!(
            count(&events, |e| matches!(e, ClientEvent::ReconnectScheduled { attempt: 1, .. })),
            1
        );
    }

    #[test]
    fn test_open_cancels_connect_timeout() {
        let (mut client, _socket, scheduler, _events) = client();
        client.connect();
        let timer = scheduler.peek(TimerKind::ConnectTimeout).unwrap();
        client.handle_open();

        assert!(scheduler.cancelled().contains(&timer));
        client.handle_timer(timer);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[test]
    fn test_malformed_frames_are_reported() {
        let (mut client, _socket, _scheduler, events) = client();
        client.connect();
        client.handle_open();

        client.handle_frame("{not json");
        client.handle_frame(r#"{"deviceId":"a"}"#);
        client.handle_frame(r#"{"type":"somethingElse"}"#);
        client.handle_frame(r#"{"type":"deviceConnected"}"#);

        let errors: Vec<String> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ClientEvent::Error { kind: ErrorKind::Protocol, message } => Some(message.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(errors.len(), 4);
        assert!(errors[1].contains("no type"));
        assert!(errors[2].contains("somethingElse"));
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[test]
    fn test_frames_delivered_verbatim_and_roster_cached() {
        let (mut client, _socket, _scheduler, events) = client();
        client.connect();
        client.handle_open();
        assert!(client.roster().is_none());

        client.handle_frame(r#"{"type":"devicesList","devices":[{"id":"a","name":"X"}]}"#);
        client.handle_frame(r#"{"type":"deviceConnected","deviceId":"a"}"#);

        assert_eq!(client.roster(), Some(&[Device::new("a", "X")][..]));
        let kinds: Vec<&str> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.message().map(Inbound::kind))
            .collect();
        assert_eq!(kinds, vec!["devicesList", "deviceConnected"]);
    }

    #[test]
    fn test_roster_cache_cleared_when_connection_ends() {
        let roster = r#"{"type":"devicesList","devices":[{"id":"a","name":"X"}]}"#;
        let (mut client, _socket, _scheduler, _events) = client();
        client.connect();
        client.handle_open();
        client.handle_frame(roster);
        assert!(client.roster().is_some());

        client.handle_close("reset");
        assert_eq!(client.state(), ConnectionState::Reconnecting);
        assert!(client.roster().is_none());

        client.connect();
        client.handle_open();
        client.handle_frame(roster);
        assert!(client.roster().is_some());

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(client.roster().is_none());
    }

    #[test]
    fn test_decode_frame_classification() {
        assert_eq!(decode_frame("[]"), Err(ProtocolError::MissingType));
        assert_eq!(
            decode_frame(r#"{"type":42}"#),
            Err(ProtocolError::MissingType)
        );
        assert!(matches!(decode_frame("nope"), Err(ProtocolError::Malformed(_))));
        assert!(matches!(
            decode_frame(r#"{"type":"error"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert_eq!(
            decode_frame(r#"{"type":"connected"}"#),
            Ok(Inbound::Connected { device_id: None })
        );
    }
}
