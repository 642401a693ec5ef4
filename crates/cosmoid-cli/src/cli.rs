//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "cosmoid")]
#[command(author, version, about = "CLI for Cosmoid devices behind a Cosmoid Bridge", long_about = None)]
pub struct Cli {
    /// Bridge WebSocket URL
    #[arg(short, long, global = true, env = "COSMOID_BRIDGE_URL")]
    pub url: Option<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "COSMOID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Seconds to wait for the bridge to connect or answer
    #[arg(short = 'T', long, global = true, default_value = "10")]
    pub timeout: u64,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// A device id argument.
#[derive(Debug, Clone, Args)]
pub struct DeviceArg {
    /// Device id as reported by the bridge
    pub device: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Follow connection state, roster and telemetry until interrupted
    Watch {
        /// Only show telemetry for these devices (repeatable)
        #[arg(short, long)]
        device: Vec<String>,

        /// Do not query info and button state for new devices
        #[arg(long)]
        no_query: bool,
    },

    /// List the devices the bridge knows about
    Devices,

    /// Show informational fields for a device
    Info(DeviceArg),

    /// Open a connection from the bridge to a device
    Connect(DeviceArg),

    /// Set the LED colour (each channel 0-4)
    Color {
        #[command(flatten)]
        device: DeviceArg,
        /// Red channel
        red: u8,
        /// Green channel
        green: u8,
        /// Blue channel
        blue: u8,
        /// Write the packet to the command characteristic instead of using setColor
        #[arg(long)]
        raw: bool,
    },

    /// Set the LED brightness as a percentage
    Luminosity {
        #[command(flatten)]
        device: DeviceArg,
        /// Brightness, 0-100
        percent: u8,
        /// Write the packet to the command characteristic instead of using setLuminosity
        #[arg(long)]
        raw: bool,
        /// Transition delay byte (raw mode only)
        #[arg(long, default_value = "0", requires = "raw")]
        delay: u8,
    },

    /// Read a characteristic by operation name (e.g. READ_SENSOR_VALUE)
    Read {
        #[command(flatten)]
        device: DeviceArg,
        /// Operation name
        operation: String,
    },

    /// Write raw bytes to a characteristic by operation name
    Write {
        #[command(flatten)]
        device: DeviceArg,
        /// Operation name
        operation: String,
        /// Bytes to write, in decimal
        #[arg(required = true, num_args = 1..)]
        value: Vec<u8>,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the configuration file path
    Path,
    /// Show the current configuration
    Show,
    /// Add or replace a device alias
    Alias {
        /// Friendly name
        name: String,
        /// Device id the name stands for
        device: String,
    },
    /// Remove a device alias
    Unalias {
        /// Friendly name
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_color() {
        let cli = Cli::try_parse_from(["cosmoid", "color", "dev-1", "4", "0", "2", "--raw"]).unwrap();
        match cli.command {
            Commands::Color {
                device,
                red,
                green,
                blue,
                raw,
            } => {
                assert_eq!(device.device, "dev-1");
                assert_eq!((red, green, blue), (4, 0, 2));
                assert!(raw);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_write_bytes_and_globals() {
        let cli = Cli::try_parse_from([
            "cosmoid",
            "write",
            "dev-1",
            "WRITE_COMMAND",
            "2",
            "4",
            "4",
            "4",
            "1",
            "--format",
            "json",
            "--url",
            "ws://bridge:9000",
        ])
        .unwrap();
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.url.as_deref(), Some("ws://bridge:9000"));
        match cli.command {
            Commands::Write { value, .. } => assert_eq!(value, vec![2, 4, 4, 4, 1]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_delay_requires_raw() {
        assert!(Cli::try_parse_from(["cosmoid", "luminosity", "dev-1", "50", "--delay", "3"]).is_err());
        assert!(
            Cli::try_parse_from(["cosmoid", "luminosity", "dev-1", "50", "--raw", "--delay", "3"])
                .is_ok()
        );
    }

    #[test]
    fn test_parse_config_alias() {
        let cli = Cli::try_parse_from(["cosmoid", "config", "alias", "desk", "dev-1"]).unwrap();
        match cli.command {
            Commands::Config {
                action: ConfigAction::Alias { name, device },
            } => {
                assert_eq!(name, "desk");
                assert_eq!(device, "dev-1");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_byte_arguments_are_range_checked() {
        assert!(Cli::try_parse_from(["cosmoid", "write", "dev-1", "WRITE_COMMAND", "256"]).is_err());
    }
}
