mod cli;
mod commands;
mod config;
mod format;
mod style;
mod util;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::{CommandContext, WatchArgs};
use crate::config::{Config, resolve_alias, resolve_format, resolve_timeout, resolve_url};
use crate::format::FormatOptions;

/// Clap default for `--timeout`, in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::path);
    let config = Config::load_from(&config_path);
    let no_color = cli.no_color || config.no_color;

    if let Commands::Config { action } = cli.command {
        return commands::cmd_config(action, &config_path, no_color);
    }

    let url = resolve_url(cli.url.as_deref(), &config);
    let ctx = CommandContext {
        client: config.client_config(url),
        timeout: Duration::from_secs(resolve_timeout(cli.timeout, &config, DEFAULT_TIMEOUT_SECS)),
        format: resolve_format(cli.format, &config),
        output: cli.output.clone(),
        quiet: cli.quiet,
        opts: FormatOptions::new(no_color),
    };
    tracing::debug!(url = %ctx.client.url, "Using Cosmoid Bridge");

    match cli.command {
        Commands::Watch { device, no_query } => {
            let devices = device.iter().map(|d| resolve_alias(d, &config)).collect();
            commands::cmd_watch(
                &ctx,
                WatchArgs {
                    devices,
                    auto_query: !no_query,
                },
            )
            .await
        }
        Commands::Devices => commands::cmd_devices(&ctx).await,
        Commands::Info(arg) => commands::cmd_info(&ctx, &resolve_alias(&arg.device, &config)).await,
        Commands::Connect(arg) => {
            commands::cmd_connect(&ctx, &resolve_alias(&arg.device, &config)).await
        }
        Commands::Color {
            device,
            red,
            green,
            blue,
            raw,
        } => {
            let device = resolve_alias(&device.device, &config);
            commands::cmd_color(&ctx, &device, (red, green, blue), raw).await
        }
        Commands::Luminosity {
            device,
            percent,
            raw,
            delay,
        } => {
            let device = resolve_alias(&device.device, &config);
            commands::cmd_luminosity(&ctx, &device, percent, raw.then_some(delay)).await
        }
        Commands::Read { device, operation } => {
            let device = resolve_alias(&device.device, &config);
            commands::cmd_read(&ctx, &device, &operation).await
        }
        Commands::Write {
            device,
            operation,
            value,
        } => {
            let device = resolve_alias(&device.device, &config);
            commands::cmd_write(&ctx, &device, &operation, value).await
        }
        Commands::Config { .. } => unreachable!("handled before the bridge context is built"),
    }
}
