//! Bridge wire protocol.
//!
//! One JSON object per text frame, discriminated by its `type` field.
//! [`Inbound`] is the closed set of frames the bridge sends; [`Outbound`] the
//! requests the client sends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Device;

/// Frames received from the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Inbound {
    /// Bridge-level connection notice, optionally scoped to one device.
    Connected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
    },
    /// Bridge-level disconnection notice, optionally scoped to one device.
    Disconnected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
    },
    /// The authoritative roster.
    DevicesList {
        #[serde(default)]
        devices: Vec<Device>,
    },
    /// Acknowledges a `connect` request.
    DeviceConnected { device_id: String },
    /// Informational fields for one device. Absent fields are unknown, not cleared.
    DeviceInfo {
        device_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        serial_number: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        firmware_revision: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hardware_revision: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        battery_level: Option<u8>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        connected: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rssi: Option<i16>,
    },
    /// A characteristic value was read or notified.
    CharacteristicChanged {
        device_id: String,
        #[serde(rename = "characteristicUUID")]
        characteristic_uuid: String,
        #[serde(default)]
        value: Vec<u8>,
    },
    /// Outcome of a bridge-side operation.
    EventResult {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<serde_json::Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Bridge-side failure.
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },
}

impl Inbound {
    /// Every `type` discriminant the client understands.
    pub const KINDS: [&'static str; 8] = [
        "connected",
        "disconnected",
        "devicesList",
        "deviceConnected",
        "deviceInfo",
        "characteristicChanged",
        "eventResult",
        "error",
    ];

    /// The `type` discriminant of this frame.
    pub fn kind(&self) -> &'static str {
        match self {
            Inbound::Connected { .. } => "connected",
            Inbound::Disconnected { .. } => "disconnected",
            Inbound::DevicesList { .. } => "devicesList",
            Inbound::DeviceConnected { .. } => "deviceConnected",
            Inbound::DeviceInfo { .. } => "deviceInfo",
            Inbound::CharacteristicChanged { .. } => "characteristicChanged",
            Inbound::EventResult { .. } => "eventResult",
            Inbound::Error { .. } => "error",
        }
    }

    /// The device this frame concerns, if any.
    pub fn device_id(&self) -> Option<&str> {
        match self {
            Inbound::Connected { device_id }
            | Inbound::Disconnected { device_id }
            | Inbound::EventResult { device_id, .. }
            | Inbound::Error { device_id, .. } => device_id.as_deref(),
            Inbound::DeviceConnected { device_id }
            | Inbound::DeviceInfo { device_id, .. }
            | Inbound::CharacteristicChanged { device_id, .. } => Some(device_id),
            Inbound::DevicesList { .. } => None,
        }
    }
}

/// Requests sent to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Outbound {
    /// Ask for the roster; answered by `devicesList`.
    GetDevices,
    /// Open a GATT connection; answered by `deviceConnected`.
    Connect { device_id: String },
    /// Set the LED colour, each channel 0..=4.
    SetColor { device_id: String, data: [u8; 3] },
    /// Set the LED brightness in the native 5..=64 range.
    SetLuminosity { device_id: String, data: [u8; 1] },
    /// Ask for informational fields; answered by `deviceInfo`.
    GetDeviceInfo { device_id: String },
    /// Write raw bytes to a characteristic.
    WriteCharacteristic {
        device_id: String,
        #[serde(rename = "characteristicUUID", with = "crate::uuid::wire")]
        characteristic_uuid: Uuid,
        value: Vec<u8>,
    },
    /// Read a characteristic; answered by `characteristicChanged`.
    ReadCharacteristic {
        device_id: String,
        #[serde(rename = "characteristicUUID", with = "crate::uuid::wire")]
        characteristic_uuid: Uuid,
    },
}

impl Outbound {
    /// The `type` discriminant of this request.
    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::GetDevices => "getDevices",
            Outbound::Connect { .. } => "connect",
            Outbound::SetColor { .. } => "setColor",
            Outbound::SetLuminosity { .. } => "setLuminosity",
            Outbound::GetDeviceInfo { .. } => "getDeviceInfo",
            Outbound::WriteCharacteristic { .. } => "writeCharacteristic",
            Outbound::ReadCharacteristic { .. } => "readCharacteristic",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::uuid::{BUTTON_STATUS, COMMAND};

    #[test]
    fn test_devices_list_parses() {
        let frame = r#"{"type":"devicesList","devices":[{"id":"a","name":"X"}]}"#;
        let inbound: Inbound = serde_json::from_str(frame).unwrap();
        assert_eq!(
            inbound,
            Inbound::DevicesList {
                devices: vec![Device::new("a", "X")]
            }
        );
    }

    #[test]
    fn test_characteristic_changed_uses_uppercase_uuid_key() {
        let frame = r#"{"type":"characteristicChanged","deviceId":"a",
            "characteristicUUID":"000015251212efde1523785feabcd123","value":[1]}"#;
        let inbound: Inbound = serde_json::from_str(frame).unwrap();
        match inbound {
            Inbound::CharacteristicChanged {
                device_id,
                characteristic_uuid,
                value,
            } => {
                assert_eq!(device_id, "a");
                assert_eq!(characteristic_uuid, "000015251212efde1523785feabcd123");
                assert_eq!(value, vec![1]);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_characteristic_changed_requires_device_id() {
        let frame = r#"{"type":"characteristicChanged","characteristicUUID":"x"}"#;
        assert!(serde_json::from_str::<Inbound>(frame).is_err());
    }

    #[test]
    fn test_error_frame_with_context() {
        let frame = r#"{"type":"error","error":"write failed","deviceId":"a","operation":"setColor"}"#;
        let inbound: Inbound = serde_json::from_str(frame).unwrap();
        assert_eq!(inbound.kind(), "error");
        assert_eq!(inbound.device_id(), Some("a"));
    }

    #[test]
    fn test_kinds_match_variants() {
        let samples = [
            json!({"type": "connected"}),
            json!({"type": "disconnected", "deviceId": "a"}),
            json!({"type": "devicesList", "devices": []}),
            json!({"type": "deviceConnected", "deviceId": "a"}),
            json!({"type": "deviceInfo", "deviceId": "a"}),
            json!({"type": "characteristicChanged", "deviceId": "a", "characteristicUUID": "u"}),
            json!({"type": "eventResult"}),
            json!({"type": "error", "error": "boom"}),
        ];
        for (sample, kind) in samples.into_iter().zip(Inbound::KINDS) {
            let inbound: Inbound = serde_json::from_value(sample).unwrap();
            assert_eq!(inbound.kind(), kind);
        }
    }

    #[test]
    fn test_get_devices_serializes_bare() {
        let json = serde_json::to_value(Outbound::GetDevices).unwrap();
        assert_eq!(json, json!({"type": "getDevices"}));
    }

    #[test]
    fn test_set_color_serializes() {
        let json = serde_json::to_value(Outbound::SetColor {
            device_id: "a".into(),
            data: [4, 0, 2],
        })
        .unwrap();
        assert_eq!(json, json!({"type": "setColor", "deviceId": "a", "data": [4, 0, 2]}));
    }

    #[test]
    fn test_write_characteristic_uses_wire_uuid() {
        let json = serde_json::to_value(Outbound::WriteCharacteristic {
            device_id: "a".into(),
            characteristic_uuid: COMMAND,
            value: vec![2, 1, 1, 1, 1],
        })
        .unwrap();
        assert_eq!(
            json,
            json!({
                "type": "writeCharacteristic",
                "deviceId": "a",
                "characteristicUUID": "000015251212efde1523785feabcd129",
                "value": [2, 1, 1, 1, 1]
            })
        );
    }

    #[test]
    fn test_read_characteristic_accepts_hyphenated_uuid() {
        let frame = json!({
            "type": "readCharacteristic",
            "deviceId": "a",
            "characteristicUUID": "00001525-1212-efde-1523-785feabcd123"
        });
        let outbound: Outbound = serde_json::from_value(frame).unwrap();
        assert_eq!(
            outbound,
            Outbound::ReadCharacteristic {
                device_id: "a".into(),
                characteristic_uuid: BUTTON_STATUS
            }
        );
        assert_eq!(outbound.kind(), "readCharacteristic");
    }
}
