//! Output formatting utilities for text and JSON output.

use std::fmt::Write as _;

use anyhow::Result;
use cosmoid_core::{Device, DeviceTelemetry, Operation, StoreEvent};
use serde::Serialize;

use crate::style;

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Use compact JSON output (one object per line).
    pub compact: bool,
}

impl FormatOptions {
    pub fn new(no_color: bool) -> Self {
        Self {
            no_color,
            compact: false,
        }
    }

    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Render the roster as JSON.
pub fn format_roster_json(devices: &[Device], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct Roster<'a> {
        count: usize,
        devices: &'a [Device],
    }

    opts.as_json(&Roster {
        count: devices.len(),
        devices,
    })
}

/// Render the roster as an aligned table.
#[must_use]
pub fn format_roster_text(devices: &[Device], opts: &FormatOptions) -> String {
    if devices.is_empty() {
        return style::format_info("The bridge reports no devices.", opts.no_color) + "\n";
    }

    let id_width = devices.iter().map(|d| d.id.len()).max().unwrap_or(0).max(2);
    let name_width = devices.iter().map(|d| d.name.len()).max().unwrap_or(0).max(4);

    let mut out = String::new();
    let header = format!(
        "{:<id_width$}  {:<name_width$}  {:<15}  {:<9}  BATTERY",
        "ID", "NAME", "SIGNAL", "LINK"
    );
    let _ = writeln!(out, "{}", style::format_title(&header, opts.no_color));
    for device in devices {
        let battery = device
            .battery_level
            .map(|b| style::format_battery_colored(b, opts.no_color))
            .unwrap_or_else(|| "-".to_string());
        // Pad before coloring; escape codes would throw off the width.
        let link = format!("{:<9}", if device.connected { "connected" } else { "-" });
        let link = if opts.no_color {
            link
        } else {
            link.replacen(
                link.trim_end(),
                &style::format_link(device.connected, false),
                1,
            )
        };
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<name_width$}  {}  {}  {}",
            device.id,
            device.name,
            style::format_signal_bar(device.rssi, opts.no_color),
            link,
            battery
        );
    }
    out
}

/// Render one device's informational fields.
#[must_use]
pub fn format_device_text(device: &Device, opts: &FormatOptions) -> String {
    let unknown = || "-".to_string();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        style::format_title(&format!("{} ({})", device.name, device.id), opts.no_color)
    );
    let rows = [
        ("Serial", device.serial_number.clone().unwrap_or_else(unknown)),
        ("Firmware", device.firmware_revision.clone().unwrap_or_else(unknown)),
        ("Hardware", device.hardware_revision.clone().unwrap_or_else(unknown)),
        (
            "Battery",
            device
                .battery_level
                .map(|b| style::format_battery_colored(b, opts.no_color))
                .unwrap_or_else(unknown),
        ),
        ("Signal", style::format_signal_bar(device.rssi, opts.no_color)),
        ("Link", style::format_link(device.connected, opts.no_color)),
    ];
    for (label, value) in rows {
        let _ = writeln!(out, "  {:<9} {}", format!("{label}:"), value);
    }
    out
}

/// Render a telemetry snapshot on one line.
#[must_use]
pub fn format_telemetry_line(device_id: &str, telemetry: &DeviceTelemetry, opts: &FormatOptions) -> String {
    let mut line = device_id.to_string();
    if telemetry.button_status.is_some() {
        let _ = write!(
            line,
            "  button={}",
            style::format_button(telemetry.is_pressed(), opts.no_color)
        );
    }
    if let Some(press) = telemetry.press_value {
        let _ = write!(line, "  press={press:>3}");
    }
    line
}

/// Interpret a characteristic value for display.
#[must_use]
pub fn describe_value(operation: Operation, value: &[u8]) -> String {
    match (operation, value.first()) {
        (_, None) => "(empty)".to_string(),
        (Operation::ReadButtonStatus, Some(0)) => "released".to_string(),
        (Operation::ReadButtonStatus, Some(_)) => "pressed".to_string(),
        (Operation::ReadSensorValue, Some(v)) => format!("{v}"),
        (Operation::ReadBatteryLevel, Some(v)) => format!("{v}%"),
        (
            Operation::ReadSerialNumber
            | Operation::ReadFirmwareVersion
            | Operation::ReadHardwareVersion,
            Some(_),
        ) => String::from_utf8_lossy(value).trim_end_matches('\0').to_string(),
        (Operation::WriteCommand, Some(_)) => format_bytes(value),
    }
}

/// Render bytes as space-separated hex.
#[must_use]
pub fn format_bytes(value: &[u8]) -> String {
    value
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a characteristic read for JSON output.
pub fn format_characteristic_json(
    device_id: &str,
    operation: Operation,
    value: &[u8],
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct Reading<'a> {
        device_id: &'a str,
        operation: Operation,
        value: &'a [u8],
        display: String,
    }

    opts.as_json(&Reading {
        device_id,
        operation,
        value,
        display: describe_value(operation, value),
    })
}

/// Render a store change as a JSON line. Returns `None` for variants with no
/// JSON form.
pub fn format_store_event_json(event: &StoreEvent, opts: &FormatOptions) -> Result<Option<String>> {
    #[derive(Serialize)]
    #[serde(tag = "event", rename_all = "camelCase")]
    enum Line<'a> {
        Roster { devices: &'a [Device] },
        Device { device: &'a Device },
        Telemetry {
            device_id: &'a str,
            telemetry: &'a DeviceTelemetry,
        },
        Error {
            kind: String,
            message: &'a str,
            device_id: Option<&'a str>,
            operation: Option<&'a str>,
        },
    }

    let line = match event {
        StoreEvent::RosterChanged(devices) => Line::Roster { devices },
        StoreEvent::DeviceUpdated(device) => Line::Device { device },
        StoreEvent::TelemetryChanged {
            device_id,
            telemetry,
        } => Line::Telemetry {
            device_id,
            telemetry,
        },
        StoreEvent::Error {
            kind,
            message,
            device_id,
            operation,
        } => Line::Error {
            kind: kind.to_string(),
            message,
            device_id: device_id.as_deref(),
            operation: operation.as_deref(),
        },
        _ => return Ok(None),
    };
    opts.as_json(&line).map(Some)
}
