//! Command encoding for Cosmoid devices.
//!
//! This module validates command parameters and builds both the raw packets
//! understood by the composite command characteristic and the protocol
//! envelopes sent to the bridge. Validation happens here, at encode time:
//! an out-of-range parameter is returned to the caller and never reaches the
//! wire.

use uuid::Uuid;

use cosmoid_types::Outbound;
use cosmoid_types::uuid::COMMAND;

use crate::error::{ColorChannel, ValidationError};

/// Leading byte of a colour packet.
/// Format: `[COLOR_PACKET, r, g, b, mode]`
pub const COLOR_PACKET: u8 = 2;

/// Trailing mode byte of a colour packet (solid colour).
pub const COLOR_MODE_SOLID: u8 = 1;

/// Leading byte of a luminosity packet.
/// Format: `[LUMINOSITY_PACKET, brightness, delay]`
pub const LUMINOSITY_PACKET: u8 = 1;

/// Highest value a colour channel accepts.
pub const COLOR_CHANNEL_MAX: u8 = 4;

/// Native brightness at 0 %.
pub const BRIGHTNESS_NATIVE_MIN: u8 = 5;

/// Native brightness at 100 %.
pub const BRIGHTNESS_NATIVE_MAX: u8 = 64;

/// Transition delay used when the caller does not give one.
pub const DEFAULT_LUMINOSITY_DELAY: u8 = 0;

type Result<T> = std::result::Result<T, ValidationError>;

fn check_channel(channel: ColorChannel, value: u8) -> Result<u8> {
    if value > COLOR_CHANNEL_MAX {
        return Err(ValidationError::ColorChannelOutOfRange { channel, value });
    }
    Ok(value)
}

fn check_device_id(device_id: impl Into<String>) -> Result<String> {
    let device_id = device_id.into();
    if device_id.trim().is_empty() {
        return Err(ValidationError::EmptyDeviceId);
    }
    Ok(device_id)
}

/// Validate an RGB triple, each channel in `0..=4`.
pub fn validate_color(r: u8, g: u8, b: u8) -> Result<[u8; 3]> {
    Ok([
        check_channel(ColorChannel::Red, r)?,
        check_channel(ColorChannel::Green, g)?,
        check_channel(ColorChannel::Blue, b)?,
    ])
}

/// Map a brightness percentage onto the device's native `5..=64` range.
///
/// `round(percent * 59 / 100) + 5`, rounding halves up.
pub fn native_brightness(percent: u8) -> Result<u8> {
    if percent > 100 {
        return Err(ValidationError::IntensityOutOfRange(percent));
    }
    let span = u32::from(BRIGHTNESS_NATIVE_MAX - BRIGHTNESS_NATIVE_MIN);
    let scaled = (u32::from(percent) * span + 50) / 100;
    // scaled <= span, so the sum stays within u8
    Ok(BRIGHTNESS_NATIVE_MIN + scaled as u8)
}

/// Build a 5-byte colour packet `[2, r, g, b, 1]`.
pub fn encode_color(r: u8, g: u8, b: u8) -> Result<[u8; 5]> {
    let [r, g, b] = validate_color(r, g, b)?;
    Ok([COLOR_PACKET, r, g, b, COLOR_MODE_SOLID])
}

/// Build a 3-byte luminosity packet with the default delay.
pub fn encode_luminosity(percent: u8) -> Result<[u8; 3]> {
    encode_luminosity_with_delay(percent, DEFAULT_LUMINOSITY_DELAY)
}

/// Build a 3-byte luminosity packet `[1, native, delay]`.
pub fn encode_luminosity_with_delay(percent: u8, delay: u8) -> Result<[u8; 3]> {
    Ok([LUMINOSITY_PACKET, native_brightness(percent)?, delay])
}

/// `getDevices` request.
pub fn encode_get_devices() -> Outbound {
    Outbound::GetDevices
}

/// `connect` request for one device.
pub fn encode_connect(device_id: impl Into<String>) -> Result<Outbound> {
    Ok(Outbound::Connect {
        device_id: check_device_id(device_id)?,
    })
}

/// `getDeviceInfo` request for one device.
pub fn encode_get_device_info(device_id: impl Into<String>) -> Result<Outbound> {
    Ok(Outbound::GetDeviceInfo {
        device_id: check_device_id(device_id)?,
    })
}

/// `setColor` request; the bridge builds the packet itself.
pub fn encode_set_color(device_id: impl Into<String>, r: u8, g: u8, b: u8) -> Result<Outbound> {
    let data = validate_color(r, g, b)?;
    Ok(Outbound::SetColor {
        device_id: check_device_id(device_id)?,
        data,
    })
}

/// `setLuminosity` request carrying the native brightness.
pub fn encode_set_luminosity(device_id: impl Into<String>, percent: u8) -> Result<Outbound> {
    let native = native_brightness(percent)?;
    Ok(Outbound::SetLuminosity {
        device_id: check_device_id(device_id)?,
        data: [native],
    })
}

/// `readCharacteristic` request.
pub fn encode_read_characteristic(device_id: impl Into<String>, uuid: Uuid) -> Result<Outbound> {
    Ok(Outbound::ReadCharacteristic {
        device_id: check_device_id(device_id)?,
        characteristic_uuid: uuid,
    })
}

/// `writeCharacteristic` request.
pub fn encode_write_characteristic(
    device_id: impl Into<String>,
    uuid: Uuid,
    value: impl Into<Vec<u8>>,
) -> Result<Outbound> {
    Ok(Outbound::WriteCharacteristic {
        device_id: check_device_id(device_id)?,
        characteristic_uuid: uuid,
        value: value.into(),
    })
}

/// Write a colour packet straight to the command characteristic.
pub fn encode_write_color(device_id: impl Into<String>, r: u8, g: u8, b: u8) -> Result<Outbound> {
    let packet = encode_color(r, g, b)?;
    encode_write_characteristic(device_id, COMMAND, packet)
}

/// Write a luminosity packet straight to the command characteristic.
pub fn encode_write_luminosity(
    device_id: impl Into<String>,
    percent: u8,
    delay: u8,
) -> Result<Outbound> {
    let packet = encode_luminosity_with_delay(percent, delay)?;
    encode_write_characteristic(device_id, COMMAND, packet)
}
