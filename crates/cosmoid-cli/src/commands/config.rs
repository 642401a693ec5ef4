//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::style;

pub fn cmd_config(action: ConfigAction, path: &Path, no_color: bool) -> Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load_from(path);
            let content =
                toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{content}");
        }
        ConfigAction::Alias { name, device } => {
            let mut config = Config::load_from(path);
            config.aliases.insert(name.clone(), device.clone());
            config.save_to(path)?;
            println!(
                "{}",
                style::format_success(&format!("Alias '{name}' -> {device}"), no_color)
            );
        }
        ConfigAction::Unalias { name } => {
            let mut config = Config::load_from(path);
            if config.aliases.remove(&name).is_none() {
                bail!("No alias named '{name}'");
            }
            config.save_to(path)?;
            println!(
                "{}",
                style::format_success(&format!("Removed alias '{name}'"), no_color)
            );
        }
    }
    Ok(())
}
