//! Tokio driver for the transport client.
//!
//! [`BridgeSession::spawn`] starts one task that owns a
//! [`TransportClient`] over a WebSocket and processes commands, socket events
//! and timer expiries one at a time. The returned [`BridgeHandle`] is the
//! cloneable front door used by the rest of the application.
//!
//! # Example
//!
//! ```no_run
//! use cosmoid_core::{BridgeSession, ClientConfig, ClientEvent, SessionOptions};
//!
//! #[tokio::main]
//! async fn main() -> cosmoid_core::Result<()> {
//!     let bridge = BridgeSession::spawn(ClientConfig::default(), SessionOptions::default())?;
//!     bridge.events().subscribe(|event: &ClientEvent| println!("{event:?}"));
//!
//!     bridge.connect()?;
//!     bridge.set_color("dev-1", 4, 0, 2)?;
//!     bridge.shutdown().await
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use cosmoid_types::uuid::Operation;
use cosmoid_types::{ConnectionState, Device, Outbound};

use crate::commands;
use crate::error::{Error, Result, TransportError};
use crate::events::{ClientEvent, ListenerRegistry};
use crate::reconnect::ClientConfig;
use crate::transport::{Scheduler, Socket, TimerId, TimerKind, TransportClient};

/// How long `shutdown` waits for the socket task to flush and close.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Socket and timer outcomes, delivered to the session task.
#[derive(Debug)]
enum LoopEvent {
    Opened { generation: u64 },
    Frame { generation: u64, text: String },
    Closed { generation: u64, reason: String },
    Timer(TimerId),
}

/// A [`Socket`] backed by a tokio-tungstenite connection task.
///
/// Every `open` starts a new connection task with a new generation number.
/// Events from earlier generations are discarded by the session.
pub struct WsSocket {
    events: mpsc::UnboundedSender<LoopEvent>,
    generation: u64,
    writer: Option<mpsc::UnboundedSender<String>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl WsSocket {
    fn new(events: mpsc::UnboundedSender<LoopEvent>) -> Self {
        Self {
            events,
            generation: 0,
            writer: None,
            cancel: None,
            task: None,
        }
    }

    /// Generation of the current connection task.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn into_task(self) -> Option<JoinHandle<()>> {
        self.task
    }
}

impl Socket for WsSocket {
    fn open(&mut self, url: &str) -> std::result::Result<(), TransportError> {
        self.close();
        self.generation += 1;

        let (writer, outgoing) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_connection(
            url.to_string(),
            self.generation,
            outgoing,
            cancel.clone(),
            self.events.clone(),
        ));

        self.writer = Some(writer);
        self.cancel = Some(cancel);
        self.task = Some(task);
        Ok(())
    }

    fn send_text(&mut self, frame: &str) -> std::result::Result<(), TransportError> {
        let writer = self
            .writer
            .as_ref()
            .ok_or_else(|| TransportError::Send("socket is not open".to_string()))?;
        writer
            .send(frame.to_string())
            .map_err(|_| TransportError::Send("connection task has stopped".to_string()))
    }

    fn close(&mut self) {
        self.writer = None;
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

/// One WebSocket connection, from handshake to close.
///
/// Outgoing frames are drained before a close request is honoured.
async fn run_connection(
    url: String,
    generation: u64,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    events: mpsc::UnboundedSender<LoopEvent>,
) {
    let connected = tokio::select! {
        result = connect_async(url.as_str()) => result,
        _ = cancel.cancelled() => {
            debug!(generation, "Connection cancelled before handshake completed");
            return;
        }
    };

    let ws = match connected {
        Ok((ws, _response)) => ws,
        Err(e) => {
            let _ = events.send(LoopEvent::Closed {
                generation,
                reason: e.to_string(),
            });
            return;
        }
    };
    debug!(generation, %url, "WebSocket handshake complete");
    let _ = events.send(LoopEvent::Opened { generation });

    let (mut sink, mut stream) = ws.split();
    let reason = loop {
        tokio::select! {
            biased;

            frame = outgoing.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        break e.to_string();
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break "closed by client".to_string();
                }
            },
            _ = cancel.cancelled() => {
                while let Ok(frame) = outgoing.try_recv() {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                let _ = sink.close().await;
                break "closed by client".to_string();
            }
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(LoopEvent::Frame { generation, text });
                }
                Some(Ok(Message::Close(frame))) => {
                    break frame
                        .map(|f| f.reason.to_string())
                        .filter(|reason| !reason.is_empty())
                        .unwrap_or_else(|| "closed by bridge".to_string());
                }
                Some(Ok(other)) => trace!(generation, ?other, "Ignoring non-text message"),
                Some(Err(e)) => break e.to_string(),
                None => break "connection closed".to_string(),
            },
        }
    };

    debug!(generation, %reason, "WebSocket closed");
    let _ = events.send(LoopEvent::Closed { generation, reason });
}

/// A [`Scheduler`] built on `tokio::time::sleep`.
pub struct TokioScheduler {
    events: mpsc::UnboundedSender<LoopEvent>,
    next_id: u64,
    timers: HashMap<TimerId, JoinHandle<()>>,
}

impl TokioScheduler {
    fn new(events: mpsc::UnboundedSender<LoopEvent>) -> Self {
        Self {
            events,
            next_id: 0,
            timers: HashMap::new(),
        }
    }

    fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.abort();
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerId {
        self.timers.retain(|_, timer| !timer.is_finished());
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let events = self.events.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(?id, ?kind, "Timer fired");
            let _ = events.send(LoopEvent::Timer(id));
        });
        self.timers.insert(id, timer);
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if let Some(timer) = self.timers.remove(&id) {
            timer.abort();
        }
    }
}

/// Behaviour of a bridge session beyond the transport itself.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Ask each newly listed device for its info and button state.
    pub auto_query: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self { auto_query: true }
    }
}

impl SessionOptions {
    pub fn auto_query(mut self, enabled: bool) -> Self {
        self.auto_query = enabled;
        self
    }
}

enum Command {
    Connect,
    Disconnect,
    Send(Outbound),
    Roster(oneshot::Sender<Option<Vec<Device>>>),
    Shutdown(oneshot::Sender<Option<JoinHandle<()>>>),
}

/// The task that owns a [`TransportClient`].
pub struct BridgeSession {
    client: TransportClient<WsSocket, TokioScheduler>,
    options: SessionOptions,
    commands: mpsc::UnboundedReceiver<Command>,
    loop_events: mpsc::UnboundedReceiver<LoopEvent>,
    state: watch::Sender<ConnectionState>,
    queried: HashSet<String>,
}

impl BridgeSession {
    /// Validate `config` and start a session task on the current runtime.
    ///
    /// The session starts `Idle`; call [`BridgeHandle::connect`] to open it.
    pub fn spawn(config: ClientConfig, options: SessionOptions) -> Result<BridgeHandle> {
        config.validate()?;

        let (loop_tx, loop_events) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (state, state_rx) = watch::channel(ConnectionState::Idle);
        let events = ListenerRegistry::new();

        let client = TransportClient::with_events(
            config,
            WsSocket::new(loop_tx.clone()),
            TokioScheduler::new(loop_tx),
            events.clone(),
        );
        let session = Self {
            client,
            options,
            commands,
            loop_events,
            state,
            queried: HashSet::new(),
        };
        tokio::spawn(session.run());

        Ok(BridgeHandle {
            commands: command_tx,
            events,
            state: state_rx,
        })
    }

    async fn run(mut self) {
        let shutdown = loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown(reply)) => break Some(reply),
                    Some(command) => self.apply(command),
                    None => break None,
                },
                Some(event) = self.loop_events.recv() => self.dispatch(event),
            }
            self.publish_state();
        };

        self.client.disconnect();
        self.publish_state();
        let (socket, mut scheduler) = self.client.into_parts();
        scheduler.cancel_all();
        let task = socket.into_task();
        match shutdown {
            Some(reply) => {
                let _ = reply.send(task);
            }
            None => debug!("All bridge handles dropped, session stopping"),
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Connect => self.client.connect(),
            Command::Disconnect => self.client.disconnect(),
            Command::Send(message) => self.client.send(&message),
            Command::Roster(reply) => {
                let _ = reply.send(self.client.roster().map(<[Device]>::to_vec));
            }
            Command::Shutdown(_) => {}
        }
    }

    fn dispatch(&mut self, event: LoopEvent) {
        let current = self.client.socket().generation();
        match event {
            LoopEvent::Timer(id) => self.client.handle_timer(id),
            LoopEvent::Opened { generation } if generation == current => {
                self.queried.clear();
                self.client.handle_open();
            }
            LoopEvent::Frame { generation, text } if generation == current => {
                self.client.handle_frame(&text);
                if self.options.auto_query {
                    self.query_new_devices();
                }
            }
            LoopEvent::Closed { generation, reason } if generation == current => {
                self.client.handle_close(&reason);
            }
            stale => trace!(?stale, current, "Discarding event from an old connection"),
        }
    }

    fn query_new_devices(&mut self) {
        let fresh: Vec<String> = match self.client.roster() {
            Some(roster) => roster
                .iter()
                .filter(|device| !self.queried.contains(&device.id))
                .map(|device| device.id.clone())
                .collect(),
            None => return,
        };

        for device_id in fresh {
            debug!(device_id = %device_id, "Querying newly listed device");
            match (
                commands::encode_get_device_info(device_id.as_str()),
                commands::encode_read_characteristic(
                    device_id.as_str(),
                    Operation::ReadButtonStatus.uuid(),
                ),
            ) {
                (Ok(info), Ok(read)) => {
                    self.client.send(&info);
                    self.client.send(&read);
                }
                (Err(e), _) | (_, Err(e)) => {
                    warn!(device_id = %device_id, error = %e, "Skipping query for device");
                }
            }
            self.queried.insert(device_id);
        }
    }

    fn publish_state(&self) {
        let state = self.client.state();
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }
}

/// Cloneable handle to a running [`BridgeSession`].
#[derive(Clone)]
pub struct BridgeHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: ListenerRegistry<ClientEvent>,
    state: watch::Receiver<ConnectionState>,
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHandle")
            .field("state", &*self.state.borrow())
            .field("listeners", &self.events.len())
            .finish()
    }
}

impl BridgeHandle {
    fn command(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::SessionClosed)
    }

    /// Open the connection. Outcomes arrive as [`ClientEvent`]s.
    pub fn connect(&self) -> Result<()> {
        self.command(Command::Connect)
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&self) -> Result<()> {
        self.command(Command::Disconnect)
    }

    /// Send a request, queueing it while the connection is not open.
    pub fn send(&self, message: Outbound) -> Result<()> {
        self.command(Command::Send(message))
    }

    /// Request the roster.
    pub fn get_devices(&self) -> Result<()> {
        self.send(commands::encode_get_devices())
    }

    /// Open a GATT connection to one device.
    pub fn connect_device(&self, device_id: &str) -> Result<()> {
        self.send(commands::encode_connect(device_id)?)
    }

    /// Request informational fields for one device.
    pub fn get_device_info(&self, device_id: &str) -> Result<()> {
        self.send(commands::encode_get_device_info(device_id)?)
    }

    /// Set the LED colour through the bridge's `setColor` request.
    pub fn set_color(&self, device_id: &str, r: u8, g: u8, b: u8) -> Result<()> {
        self.send(commands::encode_set_color(device_id, r, g, b)?)
    }

    /// Set the LED brightness through the bridge's `setLuminosity` request.
    pub fn set_luminosity(&self, device_id: &str, percent: u8) -> Result<()> {
        self.send(commands::encode_set_luminosity(device_id, percent)?)
    }

    /// Write a colour packet to the command characteristic.
    pub fn write_color(&self, device_id: &str, r: u8, g: u8, b: u8) -> Result<()> {
        self.send(commands::encode_write_color(device_id, r, g, b)?)
    }

    /// Write a luminosity packet to the command characteristic.
    pub fn write_luminosity(&self, device_id: &str, percent: u8, delay: u8) -> Result<()> {
        self.send(commands::encode_write_luminosity(device_id, percent, delay)?)
    }

    /// Read the characteristic behind `operation`.
    pub fn read_characteristic(&self, device_id: &str, operation: Operation) -> Result<()> {
        self.send(commands::encode_read_characteristic(device_id, operation.uuid())?)
    }

    /// Write raw bytes to the characteristic behind `operation`.
    pub fn write_characteristic(
        &self,
        device_id: &str,
        operation: Operation,
        value: Vec<u8>,
    ) -> Result<()> {
        self.send(commands::encode_write_characteristic(
            device_id,
            operation.uuid(),
            value,
        )?)
    }

    /// Listeners for client notifications.
    pub fn events(&self) -> &ListenerRegistry<ClientEvent> {
        &self.events
    }

    /// A receiver that tracks the connection state.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The connection state as last published by the session.
    pub fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the connection state satisfies `ready`, returning it.
    pub async fn wait_for_state(
        &self,
        ready: impl FnMut(&ConnectionState) -> bool,
    ) -> Result<ConnectionState> {
        let mut state = self.state.clone();
        let reached = state.wait_for(ready).await.map_err(|_| Error::SessionClosed)?;
        Ok(*reached)
    }

    /// The roster from the most recent `devicesList`, if any.
    pub async fn cached_roster(&self) -> Result<Option<Vec<Device>>> {
        let (reply, roster) = oneshot::channel();
        self.command(Command::Roster(reply))?;
        roster.await.map_err(|_| Error::SessionClosed)
    }

    /// Disconnect, stop the session and wait for pending frames to be written.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, task) = oneshot::channel();
        self.command(Command::Shutdown(reply))?;
        let task = task.await.map_err(|_| Error::SessionClosed)?;

        if let Some(task) = task {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Socket task ended abnormally"),
                Err(_) => warn!("Timed out waiting for socket task to close"),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spawn_rejects_invalid_config() {
        let err = BridgeSession::spawn(ClientConfig::new("http://bridge"), SessionOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_validation_happens_before_sending() {
        let bridge = BridgeSession::spawn(ClientConfig::default(), SessionOptions::default()).unwrap();
        assert!(matches!(
            bridge.set_color("a", 9, 0, 0),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            bridge.set_luminosity("", 50),
            Err(Error::Validation(_))
        ));
        bridge.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_commands_fail_after_shutdown() {
        let bridge = BridgeSession::spawn(ClientConfig::default(), SessionOptions::default()).unwrap();
        assert_eq!(bridge.current_state(), ConnectionState::Idle);
        assert_eq!(bridge.cached_roster().await.unwrap(), None);

        bridge.shutdown().await.unwrap();
        assert!(matches!(bridge.connect(), Err(Error::SessionClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = TokioScheduler::new(tx);
        let kept = scheduler.schedule(TimerKind::Reconnect, Duration::from_secs(2));
        let cancelled = scheduler.schedule(TimerKind::ConnectTimeout, Duration::from_secs(1));
        scheduler.cancel(cancelled);

        match rx.recv().await {
            Some(LoopEvent::Timer(id)) => assert_eq!(id, kept),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
