//! Visual styling utilities for the CLI.
//!
//! Every helper takes a `no_color` flag and returns plain text when it is
//! set, so output stays readable when piped.

use cosmoid_core::{ConnectionState, LogEntry, LogLevel};
use owo_colors::OwoColorize;

/// Battery thresholds (percent).
pub mod battery {
    pub const LOW: u8 = 20;
    pub const MEDIUM: u8 = 50;
}

/// Format battery percentage with appropriate color.
pub fn format_battery_colored(percent: u8, no_color: bool) -> String {
    if no_color {
        return format!("{}%", percent);
    }

    if percent < battery::LOW {
        format!("{}%", percent.red())
    } else if percent < battery::MEDIUM {
        format!("{}%", percent.yellow())
    } else {
        format!("{}%", percent.green())
    }
}

/// Format RSSI as a visual signal bar.
/// RSSI typically ranges from -100 dBm (weak) to -30 dBm (strong).
pub fn format_signal_bar(rssi: i16, no_color: bool) -> String {
    // -30 dBm = excellent (10), -100 dBm = very weak (0)
    let strength = ((rssi + 100).clamp(0, 70) as f32 / 7.0).round() as usize;
    let filled = strength.min(10);
    let empty = 10 - filled;

    let bar = format!("{}{}", "█".repeat(filled), "░".repeat(empty));

    if no_color {
        format!("{} {:>4}", bar, rssi)
    } else if filled >= 7 {
        format!("{} {:>4}", bar.green(), rssi)
    } else if filled >= 4 {
        format!("{} {:>4}", bar.yellow(), rssi)
    } else {
        format!("{} {:>4}", bar.red(), rssi)
    }
}

/// Format a connection state.
pub fn format_state_colored(state: ConnectionState, no_color: bool) -> String {
    let label = state.to_string();
    if no_color {
        return label;
    }
    match state {
        ConnectionState::Open => format!("{}", label.green()),
        ConnectionState::Connecting | ConnectionState::Reconnecting => {
            format!("{}", label.yellow())
        }
        ConnectionState::Failed => format!("{}", label.red()),
        ConnectionState::Idle | ConnectionState::Closed => format!("{}", label.dimmed()),
    }
}

/// Format whether a device is connected to the bridge.
pub fn format_link(connected: bool, no_color: bool) -> String {
    match (connected, no_color) {
        (true, true) => "connected".to_string(),
        (false, true) => "-".to_string(),
        (true, false) => format!("{}", "connected".green()),
        (false, false) => format!("{}", "-".dimmed()),
    }
}

/// Format the button state.
pub fn format_button(pressed: bool, no_color: bool) -> String {
    match (pressed, no_color) {
        (true, true) => "pressed".to_string(),
        (false, true) => "released".to_string(),
        (true, false) => format!("{}", "pressed".bold().cyan()),
        (false, false) => "released".to_string(),
    }
}

/// Format a connection log entry, colored by level.
pub fn format_log_entry(entry: &LogEntry, no_color: bool) -> String {
    let line = entry.to_string();
    if no_color {
        return line;
    }
    match entry.level {
        LogLevel::Info => line,
        LogLevel::Success => format!("{}", line.green()),
        LogLevel::Warning => format!("{}", line.yellow()),
        LogLevel::Error => format!("{}", line.red()),
    }
}

/// Format a success message.
pub fn format_success(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[OK] {}", message)
    } else {
        format!("{} {}", "[OK]".green(), message)
    }
}

/// Format an info message.
pub fn format_info(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[--] {}", message)
    } else {
        format!("{} {}", "[--]".cyan(), message)
    }
}

/// Format a warning message.
pub fn format_warning(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[!!] {}", message)
    } else {
        format!("{} {}", "[!!]".yellow(), message)
    }
}

/// Format an error message.
pub fn format_error(message: &str, no_color: bool) -> String {
    if no_color {
        format!("[XX] {}", message)
    } else {
        format!("{} {}", "[XX]".red(), message)
    }
}

/// Format a section title.
pub fn format_title(title: &str, no_color: bool) -> String {
    if no_color {
        title.to_string()
    } else {
        format!("{}", title.bold())
    }
}
