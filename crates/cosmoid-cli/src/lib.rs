//! Command-line interface for Cosmoid devices behind a Cosmoid Bridge.
//!
//! The `cosmoid` binary talks to the bridge over its WebSocket protocol
//! using [`cosmoid_core`].
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `watch` | Follow connection state, roster and telemetry |
//! | `devices` | List the devices the bridge knows about |
//! | `info` | Show informational fields for a device |
//! | `connect` | Open a connection from the bridge to a device |
//! | `color` | Set the LED colour |
//! | `luminosity` | Set the LED brightness |
//! | `read` | Read a characteristic by operation name |
//! | `write` | Write raw bytes to a characteristic |
//! | `config` | Manage CLI configuration |
//!
//! # Configuration
//!
//! The CLI reads `~/.config/cosmoid/config.toml` (or platform equivalent):
//!
//! ```toml
//! url = "ws://192.168.1.20:8080"
//! format = "text"
//! timeout = 10
//!
//! [aliases]
//! desk = "dev-1"
//!
//! [reconnect]
//! max_attempts = 5
//! base_delay_ms = 2000
//! max_delay_ms = 10000
//! connect_timeout_ms = 3000
//! ```
//!
//! # Environment Variables
//!
//! - `COSMOID_BRIDGE_URL`: Bridge URL (overridden by `--url`)
//! - `COSMOID_CONFIG`: Configuration file path
//! - `NO_COLOR`: Disable colored output when set
//! - `RUST_LOG`: Log filter when neither `--verbose` nor `--quiet` is given
//!
//! # Examples
//!
//! ```bash
//! cosmoid devices
//! cosmoid color desk 4 0 2
//! cosmoid luminosity dev-1 75
//! cosmoid read dev-1 READ_SENSOR_VALUE --format json
//! cosmoid watch --device dev-1
//! ```

// Re-export core dependencies for convenience
pub use cosmoid_core;
pub use cosmoid_types;
