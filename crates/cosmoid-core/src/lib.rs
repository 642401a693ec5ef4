//! Bridge client for Cosmoid force-sensing peripherals.
//!
//! Cosmoids are not reached directly: a local bridge process speaks
//! Bluetooth to them and exposes a JSON-over-WebSocket protocol. This crate
//! is the client side of that protocol.
//!
//! # Features
//!
//! - **Command encoding**: validated colour, luminosity, read and write requests
//! - **Connection lifecycle**: an explicit state machine with linear backoff
//!   and a connect timeout
//! - **Outbound queue**: requests made while disconnected are delivered in
//!   order once the connection opens
//! - **Notifications**: a synchronous listener registry that isolates
//!   misbehaving listeners
//! - **Device state**: a de-duplicating roster and telemetry store
//! - **Connection log**: a bounded, human-readable activity history
//!
//! # Layers
//!
//! | Layer | Type | Notes |
//! |-------|------|-------|
//! | State machine | [`TransportClient`] | synchronous, no I/O; generic over [`Socket`] and [`Scheduler`] |
//! | Runtime | [`BridgeSession`] / [`BridgeHandle`] | tokio task over tokio-tungstenite |
//! | State | [`DeviceStateStore`] | subscribes to client notifications |
//!
//! # Quick Start
//!
//! ```no_run
//! use cosmoid_core::{BridgeSession, ClientConfig, DeviceStateStore, SessionOptions, StoreEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bridge = BridgeSession::spawn(ClientConfig::default(), SessionOptions::default())?;
//!
//!     let store = DeviceStateStore::new();
//!     store.attach(bridge.events());
//!     store.events().subscribe(|event: &StoreEvent| {
//!         if let StoreEvent::TelemetryChanged { device_id, telemetry } = event {
//!             println!("{device_id}: pressed={}", telemetry.is_pressed());
//!         }
//!     });
//!
//!     bridge.connect()?;
//!     bridge.set_luminosity("dev-1", 75)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     bridge.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod commands;
pub mod connection_log;
pub mod error;
pub mod events;
pub mod mock;
pub mod reconnect;
pub mod store;
pub mod transport;

// Core exports
pub use bridge::{BridgeHandle, BridgeSession, SessionOptions, TokioScheduler, WsSocket};
pub use connection_log::{ConnectionLog, LogEntry, LogLevel};
pub use error::{
    ColorChannel, Error, ErrorKind, LookupError, ProtocolError, Result, TransportError,
    ValidationError,
};
pub use events::{ClientEvent, DisconnectReason, ListenerRegistry, Subscription};
pub use reconnect::{ClientConfig, DEFAULT_BRIDGE_URL, ReconnectOptions};
pub use store::{DeviceStateStore, StoreEvent};
pub use transport::{Scheduler, Socket, TimerId, TimerKind, TransportClient, decode_frame};

// Re-export from cosmoid-types
pub use cosmoid_types::uuid as uuids;
pub use cosmoid_types::{ConnectionState, Device, DeviceTelemetry, Inbound, Operation, Outbound};
