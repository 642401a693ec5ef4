//! Core types for Cosmoid device state.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A Cosmoid as reported by the bridge.
///
/// Identity is `id`; the roster never holds two entries with the same id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Bridge-assigned peripheral identifier.
    pub id: String,
    /// Advertised name.
    #[serde(default)]
    pub name: String,
    /// Signal strength in dBm.
    #[serde(default)]
    pub rssi: i16,
    /// Whether the bridge currently holds a GATT connection to the device.
    #[serde(default)]
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_revision: Option<String>,
    /// Battery level (0-100).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<u8>,
}

impl Device {
    /// Create a device with the given identity and no extra information.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the RSSI.
    #[must_use]
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = rssi;
        self
    }

    /// Set the connected flag.
    #[must_use]
    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }

    /// Set the battery level.
    #[must_use]
    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery_level = Some(level);
        self
    }

    /// Positional roster comparison: same id and same name.
    pub fn same_identity(&self, other: &Device) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.name, self.id)
        }
    }
}

/// Live values derived from characteristic notifications for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceTelemetry {
    /// Button state: 0 released, 1 pressed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_status: Option<u8>,
    /// Force applied to the sensor, 0..=255.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub press_value: Option<u8>,
}

impl DeviceTelemetry {
    /// Whether the button is currently held down.
    pub fn is_pressed(&self) -> bool {
        self.button_status.is_some_and(|status| status != 0)
    }
}

/// Lifecycle of the bridge connection.
///
/// Exactly one value holds at any time. Legal edges:
///
/// ```text
/// Idle | Closed | Failed | Reconnecting --connect--> Connecting
/// Connecting --open--> Open
/// Connecting | Open --unexpected close--> Reconnecting
/// Reconnecting --attempts exhausted--> Failed
/// any --disconnect--> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, next) {
            (Idle | Closed | Failed | Reconnecting, Connecting) => true,
            (Connecting, Open) => true,
            (Connecting | Open, Reconnecting) => true,
            (Reconnecting, Failed) => true,
            // Reached directly when a close arrives and auto-reconnect is off,
            // or when the attempt budget is already spent.
            (Connecting | Open, Failed) => true,
            (current, Closed) => current != Closed,
            _ => false,
        }
    }

    /// Whether a socket is open or being opened.
    pub fn is_active(self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(label)
    }
}
