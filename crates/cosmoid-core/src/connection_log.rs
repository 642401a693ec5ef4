//! Bounded, human-readable history of connection activity.
//!
//! A UI "connection logs" panel wants a short list of what the client has
//! been doing. [`ConnectionLog`] turns [`ClientEvent`]s into timestamped
//! entries and keeps the most recent ones.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

use cosmoid_types::{ConnectionState, Inbound};

use crate::events::{ClientEvent, DisconnectReason};

/// Entries kept when no capacity is given.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// One line of the connection log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.timestamp.time();
        write!(
            f,
            "{:02}:{:02}:{:02} [{}] {}",
            t.hour(),
            t.minute(),
            t.second(),
            self.level,
            self.message
        )
    }
}

/// Ring buffer of the most recent log entries, oldest first.
#[derive(Debug, Clone)]
pub struct ConnectionLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for ConnectionLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl ConnectionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log keeping at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when full.
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: OffsetDateTime::now_utc(),
            level,
            message: message.into(),
        });
    }

    /// Record `event` if it is worth showing. Returns whether an entry was added.
    pub fn record(&mut self, event: &ClientEvent) -> bool {
        let Some((level, message)) = describe(event) else {
            return false;
        };
        self.push(level, message);
        true
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

fn describe(event: &ClientEvent) -> Option<(LogLevel, String)> {
    let entry = match event {
        ClientEvent::StateChanged {
            to: ConnectionState::Connecting,
            ..
        } => (LogLevel::Info, "Connecting to Cosmoid Bridge...".to_string()),
        ClientEvent::StateChanged { .. } => return None,
        ClientEvent::Connected => (LogLevel::Success, "Connected to Cosmoid Bridge".to_string()),
        ClientEvent::Disconnected {
            reason: DisconnectReason::UserRequested,
        } => (LogLevel::Info, "Disconnected from Cosmoid Bridge".to_string()),
        ClientEvent::Disconnected { reason } => (LogLevel::Warning, capitalize(&reason.to_string())),
        ClientEvent::ReconnectScheduled { attempt, delay } => (
            LogLevel::Info,
            format!("Reconnecting in {delay:?} (attempt {attempt})"),
        ),
        ClientEvent::ConnectionFailed { reason } => (LogLevel::Error, reason.clone()),
        ClientEvent::Error { kind, message } => (LogLevel::Error, format!("{kind} error: {message}")),
        ClientEvent::Message(inbound) => return describe_message(inbound),
    };
    Some(entry)
}

fn describe_message(inbound: &Inbound) -> Option<(LogLevel, String)> {
    match inbound {
        Inbound::DevicesList { devices } => Some((
            LogLevel::Info,
            format!("Found {} device(s)", devices.len()),
        )),
        Inbound::DeviceConnected { device_id } => {
            Some((LogLevel::Success, format!("Device {device_id} connected")))
        }
        Inbound::Disconnected {
            device_id: Some(device_id),
        } => Some((LogLevel::Warning, format!("Device {device_id} disconnected"))),
        Inbound::Error {
            error, device_id, ..
        } => Some((
            LogLevel::Error,
            match device_id {
                Some(device_id) => format!("Bridge error on {device_id}: {error}"),
                None => format!("Bridge error: {error}"),
            },
        )),
        _ => None,
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut log = ConnectionLog::with_capacity(2);
        log.push(LogLevel::Info, "one");
        log.push(LogLevel::Info, "two");
        log.push(LogLevel::Info, "three");

        let messages: Vec<_> = log.entries().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }

    #[test]
    fn test_default_capacity() {
        let mut log = ConnectionLog::new();
        for i in 0..150 {
            log.push(LogLevel::Info, i.to_string());
        }
        assert_eq!(log.len(), DEFAULT_LOG_CAPACITY);
        assert_eq!(log.latest().unwrap().message, "149");
    }

    #[test]
    fn test_record_levels() {
        let mut log = ConnectionLog::new();
        assert!(log.record(&ClientEvent::Connected));
        assert!(log.record(&ClientEvent::Disconnected {
            reason: DisconnectReason::ConnectionLost("reset".into()),
        }));
        assert!(log.record(&ClientEvent::ReconnectScheduled {
            attempt: 2,
            delay: Duration::from_secs(4),
        }));
        assert!(log.record(&ClientEvent::Error {
            kind: ErrorKind::Protocol,
            message: "bad frame".into(),
        }));

        let levels: Vec<_> = log.entries().map(|e| e.level).collect();
        assert_eq!(
            levels,
            vec![LogLevel::Success, LogLevel::Warning, LogLevel::Info, LogLevel::Error]
        );
        let messages: Vec<_> = log.entries().map(|e| e.message.clone()).collect();
        assert_eq!(messages[1], "Connection lost: reset");
        assert_eq!(messages[2], "Reconnecting in 4s (attempt 2)");
        assert_eq!(messages[3], "protocol error: bad frame");
    }

    #[test]
    fn test_sub_second_reconnect_delay() {
        let mut log = ConnectionLog::new();
        log.record(&ClientEvent::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_millis(250),
        });
        assert_eq!(log.latest().unwrap().message, "Reconnecting in 250ms (attempt 1)");
    }

    #[test]
    fn test_quiet_events_not_recorded() {
        let mut log = ConnectionLog::new();
        assert!(!log.record(&ClientEvent::StateChanged {
            from: ConnectionState::Connecting,
            to: ConnectionState::Open,
        }));
        assert!(!log.record(&ClientEvent::Message(Inbound::Connected { device_id: None })));
        assert!(log.record(&ClientEvent::Message(Inbound::DevicesList { devices: vec![] })));
        assert_eq!(log.latest().unwrap().message, "Found 0 device(s)");
    }

    #[test]
    fn test_entry_display() {
        let entry = LogEntry {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            level: LogLevel::Warning,
            message: "Device a disconnected".into(),
        };
        assert_eq!(entry.to_string(), "00:00:00 [warning] Device a disconnected");
    }
}
