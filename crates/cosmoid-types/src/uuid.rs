//! Bluetooth UUIDs for Cosmoid devices.
//!
//! This module is the characteristic catalogue: the fixed identifiers of the
//! Cosmoid GATT services and characteristics, and the bidirectional mapping
//! between symbolic [`Operation`]s and the characteristics that carry them.
//!
//! The bridge speaks identifiers in their 32-digit "simple" form
//! (`000015251212efde1523785feabcd123`). Lookups accept either that form or the
//! hyphenated one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::{Uuid, uuid};

use crate::error::{LookupError, LookupResult};

// --- Cosmoid Service UUIDs ---

/// Primary Cosmoid service.
pub const COSMOID_SERVICE: Uuid = uuid!("00001523-1212-efde-1523-785feabcd123");

/// Device Information service.
pub const DEVICE_INFO_SERVICE: Uuid = uuid!("0000180a-0000-1000-8000-00805f9b34fb");

/// Battery service.
pub const BATTERY_SERVICE: Uuid = uuid!("0000180f-0000-1000-8000-00805f9b34fb");

// --- Cosmoid Characteristic UUIDs ---

/// Button state, one byte: 0 released, 1 pressed.
pub const BUTTON_STATUS: Uuid = uuid!("00001525-1212-efde-1523-785feabcd123");

/// Force sensor value, one byte 0..=255.
pub const SENSOR_VALUE: Uuid = uuid!("00001525-1212-efde-1523-785feabcd124");

/// Battery level as a percentage.
pub const BATTERY_LEVEL_CUSTOM: Uuid = uuid!("00001525-1212-efde-1523-785feabcd125");

/// Serial number string.
pub const SERIAL_NUMBER_CUSTOM: Uuid = uuid!("00001525-1212-efde-1523-785feabcd126");

/// Firmware version string.
pub const FIRMWARE_VERSION_CUSTOM: Uuid = uuid!("00001525-1212-efde-1523-785feabcd127");

/// Hardware version string.
pub const HARDWARE_VERSION_CUSTOM: Uuid = uuid!("00001525-1212-efde-1523-785feabcd128");

/// Composite command characteristic.
///
/// Accepts 5-byte colour packets `[2, r, g, b, mode]` and 3-byte luminosity
/// packets `[1, brightness, delay]`.
pub const COMMAND: Uuid = uuid!("00001525-1212-efde-1523-785feabcd129");

// --- Standard Characteristic UUIDs ---

/// Battery level characteristic.
pub const BATTERY_LEVEL: Uuid = uuid!("00002a19-0000-1000-8000-00805f9b34fb");

/// Model number string characteristic.
pub const MODEL_NUMBER: Uuid = uuid!("00002a24-0000-1000-8000-00805f9b34fb");

/// Serial number string characteristic.
pub const SERIAL_NUMBER: Uuid = uuid!("00002a25-0000-1000-8000-00805f9b34fb");

/// Firmware revision string characteristic.
pub const FIRMWARE_REVISION: Uuid = uuid!("00002a26-0000-1000-8000-00805f9b34fb");

/// Hardware revision string characteristic.
pub const HARDWARE_REVISION: Uuid = uuid!("00002a27-0000-1000-8000-00805f9b34fb");

/// Manufacturer name string characteristic.
pub const MANUFACTURER_NAME: Uuid = uuid!("00002a29-0000-1000-8000-00805f9b34fb");

/// Symbolic operations the client can address on a Cosmoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    ReadButtonStatus,
    ReadSensorValue,
    ReadBatteryLevel,
    ReadSerialNumber,
    ReadFirmwareVersion,
    ReadHardwareVersion,
    WriteCommand,
}

impl Operation {
    /// Every catalogued operation, in catalogue order.
    pub const ALL: [Operation; 7] = [
        Operation::ReadButtonStatus,
        Operation::ReadSensorValue,
        Operation::ReadBatteryLevel,
        Operation::ReadSerialNumber,
        Operation::ReadFirmwareVersion,
        Operation::ReadHardwareVersion,
        Operation::WriteCommand,
    ];

    /// The characteristic that carries this operation.
    pub const fn uuid(self) -> Uuid {
        match self {
            Operation::ReadButtonStatus => BUTTON_STATUS,
            Operation::ReadSensorValue => SENSOR_VALUE,
            Operation::ReadBatteryLevel => BATTERY_LEVEL_CUSTOM,
            Operation::ReadSerialNumber => SERIAL_NUMBER_CUSTOM,
            Operation::ReadFirmwareVersion => FIRMWARE_VERSION_CUSTOM,
            Operation::ReadHardwareVersion => HARDWARE_VERSION_CUSTOM,
            Operation::WriteCommand => COMMAND,
        }
    }

    /// Resolve the operation carried by a characteristic.
    pub fn from_uuid(uuid: Uuid) -> LookupResult<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.uuid() == uuid)
            .ok_or_else(|| LookupError::UnknownUuid(to_wire(uuid)))
    }

    /// The symbolic name, e.g. `READ_BUTTON_STATUS`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Operation::ReadButtonStatus => "READ_BUTTON_STATUS",
            Operation::ReadSensorValue => "READ_SENSOR_VALUE",
            Operation::ReadBatteryLevel => "READ_BATTERY_LEVEL",
            Operation::ReadSerialNumber => "READ_SERIAL_NUMBER",
            Operation::ReadFirmwareVersion => "READ_FIRMWARE_VERSION",
            Operation::ReadHardwareVersion => "READ_HARDWARE_VERSION",
            Operation::WriteCommand => "WRITE_COMMAND",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = LookupError;

    fn from_str(s: &str) -> LookupResult<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LookupError::UnknownOperation(s.to_string()))
    }
}

/// Look up the characteristic UUID for a symbolic operation name.
pub fn get_uuid(operation: &str) -> LookupResult<Uuid> {
    operation.parse::<Operation>().map(Operation::uuid)
}

/// Look up the symbolic operation for a characteristic identifier.
///
/// Accepts the simple 32-digit form used on the wire as well as the
/// hyphenated form.
pub fn get_operation(uuid: &str) -> LookupResult<Operation> {
    Operation::from_uuid(parse_uuid(uuid)?)
}

/// Parse a characteristic identifier in any form [`Uuid::parse_str`] accepts.
pub fn parse_uuid(uuid: &str) -> LookupResult<Uuid> {
    Uuid::parse_str(uuid.trim()).map_err(|_| LookupError::InvalidUuid(uuid.to_string()))
}

/// Render a UUID in the bridge's wire form.
pub fn to_wire(uuid: Uuid) -> String {
    uuid.simple().to_string()
}

/// Serde adapter writing UUIDs in wire form and reading either form.
pub mod wire {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(uuid: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_wire(*uuid))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_uuid(&raw).map_err(D::Error::custom)
    }
}
