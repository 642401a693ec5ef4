//! Test doubles for the transport seams.
//!
//! [`MockSocket`] and [`ManualScheduler`] let a
//! [`TransportClient`](crate::transport::TransportClient) run without any
//! I/O. Both are cheap handles over shared state: keep a clone to inspect
//! what the client did and to inject failures while the client owns the
//! other.
//!
//! # Example
//!
//! ```
//! use cosmoid_core::mock::{ManualScheduler, MockSocket};
//! use cosmoid_core::{ClientConfig, ConnectionState, TimerKind, TransportClient};
//!
//! let socket = MockSocket::new();
//! let scheduler = ManualScheduler::new();
//! let mut client = TransportClient::new(ClientConfig::default(), socket.clone(), scheduler.clone());
//!
//! client.connect();
//! client.handle_open();
//! assert_eq!(client.state(), ConnectionState::Open);
//! assert_eq!(socket.sent(), vec![r#"{"type":"getDevices"}"#.to_string()]);
//!
//! client.handle_close("reset");
//! let timer = scheduler.take(TimerKind::Reconnect).unwrap();
//! client.handle_timer(timer);
//! assert_eq!(client.state(), ConnectionState::Connecting);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{Scheduler, Socket, TimerId, TimerKind};

#[derive(Debug, Default)]
struct SocketState {
    opened: Vec<String>,
    sent: Vec<String>,
    closes: u32,
    fail_opens: bool,
    fail_sends: bool,
}

/// A socket that records what it is asked to do.
#[derive(Debug, Clone, Default)]
pub struct MockSocket {
    state: Arc<Mutex<SocketState>>,
}

impl MockSocket {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SocketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make subsequent `open` calls fail immediately.
    pub fn fail_opens(&self, fail: bool) {
        self.lock().fail_opens = fail;
    }

    /// Make subsequent `send_text` calls fail.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    /// URLs passed to `open`, including failed attempts.
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    /// Frames written successfully, in order.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Number of `close` calls.
    pub fn closes(&self) -> u32 {
        self.lock().closes
    }
}

impl Socket for MockSocket {
    fn open(&mut self, url: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.opened.push(url.to_string());
        if state.fail_opens {
            return Err(TransportError::Connect("mock open failure".to_string()));
        }
        Ok(())
    }

    fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(TransportError::Send("mock send failure".to_string()));
        }
        state.sent.push(frame.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.lock().closes += 1;
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    next_id: u64,
    pending: Vec<(TimerId, TimerKind, Duration)>,
    cancelled: Vec<TimerId>,
}

/// A scheduler whose timers only fire when the test says so.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Arc<Mutex<SchedulerState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The oldest pending timer of `kind`, left pending.
    pub fn peek(&self, kind: TimerKind) -> Option<TimerId> {
        self.lock()
            .pending
            .iter()
            .find(|(_, k, _)| *k == kind)
            .map(|(id, _, _)| *id)
    }

    /// Remove and return the oldest pending timer of `kind`, as if it fired.
    ///
    /// Pass the id to `handle_timer` to deliver the expiry.
    pub fn take(&self, kind: TimerKind) -> Option<TimerId> {
        let mut state = self.lock();
        let index = state.pending.iter().position(|(_, k, _)| *k == kind)?;
        Some(state.pending.remove(index).0)
    }

    /// Delay of the oldest pending timer of `kind`.
    pub fn pending_delay(&self, kind: TimerKind) -> Option<Duration> {
        self.lock()
            .pending
            .iter()
            .find(|(_, k, _)| *k == kind)
            .map(|(_, _, delay)| *delay)
    }

    /// Number of pending timers.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Ids passed to `cancel`.
    pub fn cancelled(&self) -> Vec<TimerId> {
        self.lock().cancelled.clone()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, kind: TimerKind, delay: Duration) -> TimerId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = TimerId(state.next_id);
        state.pending.push((id, kind, delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        let mut state = self.lock();
        state.pending.retain(|(pending, _, _)| *pending != id);
        state.cancelled.push(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_socket_records_and_fails() {
        let mut socket = MockSocket::new();
        let probe = socket.clone();

        socket.open("ws://a").unwrap();
        socket.send_text("one").unwrap();
        probe.fail_sends(true);
        assert!(socket.send_text("two").is_err());
        socket.close();

        assert_eq!(probe.opened(), vec!["ws://a".to_string()]);
        assert_eq!(probe.sent(), vec!["one".to_string()]);
        assert_eq!(probe.closes(), 1);

        probe.fail_opens(true);
        assert!(matches!(socket.open("ws://b"), Err(TransportError::Connect(_))));
        assert_eq!(probe.opened().len(), 2);
    }

    #[test]
    fn test_manual_scheduler() {
        let mut scheduler = ManualScheduler::new();
        let first = scheduler.schedule(TimerKind::Reconnect, Duration::from_secs(2));
        let second = scheduler.schedule(TimerKind::ConnectTimeout, Duration::from_secs(3));
        assert_ne!(first, second);
        assert_eq!(scheduler.pending(), 2);

        scheduler.cancel(second);
        assert_eq!(scheduler.peek(TimerKind::ConnectTimeout), None);
        assert_eq!(scheduler.cancelled(), vec![second]);

        assert_eq!(
            scheduler.pending_delay(TimerKind::Reconnect),
            Some(Duration::from_secs(2))
        );
        assert_eq!(scheduler.take(TimerKind::Reconnect), Some(first));
        assert_eq!(scheduler.pending(), 0);
    }
}
