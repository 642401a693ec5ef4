//! Error types for cosmoid-core.
//!
//! Errors fall into four families, each with its own recovery policy:
//!
//! | Family | Raised by | Recovery |
//! |--------|-----------|----------|
//! | [`TransportError`] | socket open/send/close, connect timeout | automatic backoff and reconnect; surfaced as `ConnectionFailed` only when attempts are exhausted |
//! | [`ProtocolError`] | inbound frame decoding | logged and reported as an `Error` notification; the frame is dropped |
//! | [`ValidationError`] | command encoding | returned synchronously to the caller; nothing is sent |
//! | [`LookupError`] | characteristic catalogue | returned to the caller; the state store reports it as an `Error` notification |
//!
//! None of them is fatal: the client stays callable after any error.

use std::time::Duration;

use thiserror::Error;

pub use cosmoid_types::LookupError;

/// Which colour channel failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Red,
    Green,
    Blue,
}

impl std::fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Green => write!(f, "green"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Command parameters outside their contractual range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A colour channel is outside 0..=4.
    #[error("{channel} channel must be between 0 and 4, got {value}")]
    ColorChannelOutOfRange { channel: ColorChannel, value: u8 },

    /// A brightness percentage is outside 0..=100.
    #[error("Brightness must be between 0 and 100, got {0}")]
    IntensityOutOfRange(u8),

    /// A command was addressed to an empty device id.
    #[error("Device id must not be empty")]
    EmptyDeviceId,
}

/// Inbound frames the client could not interpret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// The frame is not JSON, or does not match its declared type.
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// The frame has no string `type` field.
    #[error("Frame has no type field")]
    MissingType,

    /// The frame's `type` is not part of the protocol.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// A characteristic notification carried no bytes.
    #[error("Empty value for characteristic {characteristic} on {device_id}")]
    EmptyValue {
        device_id: String,
        characteristic: String,
    },
}

/// Socket-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The socket could not be opened.
    #[error("Unable to connect to Cosmoid Bridge: {0}")]
    Connect(String),

    /// A frame could not be written.
    #[error("Failed to send frame: {0}")]
    Send(String),

    /// The socket did not open within the connect timeout.
    #[error("Connection attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The socket closed without being asked to.
    #[error("Connection to Cosmoid Bridge was lost: {0}")]
    Closed(String),
}

/// Coarse classification carried on error notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Protocol,
    /// An `error` frame, or a failed `eventResult`, reported by the bridge.
    Bridge,
    Validation,
    Lookup,
    Config,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Bridge => "bridge",
            Self::Validation => "validation",
            Self::Lookup => "lookup",
            Self::Config => "config",
        };
        f.write_str(label)
    }
}

/// Errors that can occur in the bridge client.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The bridge session task is no longer running.
    #[error("Bridge session is closed")]
    SessionClosed,
}

impl Error {
    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// The family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) | Error::SessionClosed => ErrorKind::Transport,
            Error::Protocol(_) => ErrorKind::Protocol,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Lookup(_) => ErrorKind::Lookup,
            Error::InvalidConfig(_) => ErrorKind::Config,
        }
    }
}

/// Result type alias using cosmoid-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
