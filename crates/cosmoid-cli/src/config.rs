//! Configuration file management.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use cosmoid_core::{ClientConfig, DEFAULT_BRIDGE_URL, ReconnectOptions};
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Bridge WebSocket URL
    #[serde(default)]
    pub url: Option<String>,

    /// Default output format ("text" or "json")
    #[serde(default)]
    pub format: Option<String>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Seconds to wait for the bridge to connect or answer
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Reconnect after an unexpected drop
    #[serde(default)]
    pub auto_reconnect: Option<bool>,

    /// Device aliases (friendly name -> device id)
    #[serde(default)]
    pub aliases: HashMap<String, String>,

    /// Reconnect policy overrides
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnect policy overrides. Unset fields keep the library defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub base_delay_ms: Option<u64>,
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
}

impl ReconnectConfig {
    /// Apply the overrides on top of the default policy.
    pub fn to_options(&self) -> ReconnectOptions {
        let mut options = ReconnectOptions::default();
        if let Some(attempts) = self.max_attempts {
            options = options.max_attempts(attempts);
        }
        if let Some(ms) = self.base_delay_ms {
            options = options.base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.max_delay_ms {
            options = options.max_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connect_timeout_ms {
            options = options.connect_timeout(Duration::from_millis(ms));
        }
        options
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cosmoid")
            .join("config.toml")
    }

    /// Load config from `path`, or return default if missing or unreadable
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Build the client configuration for `url`.
    pub fn client_config(&self, url: impl Into<String>) -> ClientConfig {
        ClientConfig::new(url)
            .reconnect(self.reconnect.to_options())
            .auto_reconnect(self.auto_reconnect.unwrap_or(true))
    }
}

/// Resolve the bridge URL: flag or env var, then config, then the default.
pub fn resolve_url(url: Option<&str>, config: &Config) -> String {
    url.map(str::to_string)
        .or_else(|| config.url.clone())
        .unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string())
}

/// Resolve the output format: flag, then config, then text.
pub fn resolve_format(format: Option<OutputFormat>, config: &Config) -> OutputFormat {
    format.unwrap_or_else(|| match config.format.as_deref() {
        Some(f) if f.eq_ignore_ascii_case("json") => OutputFormat::Json,
        _ => OutputFormat::Text,
    })
}

/// Resolve timeout: use provided value, fall back to config, then default
pub fn resolve_timeout(cmd_timeout: u64, config: &Config, default: u64) -> u64 {
    if cmd_timeout != default {
        cmd_timeout
    } else {
        config.timeout.unwrap_or(default)
    }
}

/// Resolve a device alias to its id. Unknown names are returned unchanged.
pub fn resolve_alias(device: &str, config: &Config) -> String {
    config
        .aliases
        .get(device)
        .cloned()
        .unwrap_or_else(|| device.to_string())
}
