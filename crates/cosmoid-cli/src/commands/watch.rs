//! Watch command implementation.
//!
//! Keeps one session open until Ctrl-C. Connection activity goes to stderr as
//! connection log lines; roster and telemetry changes go to the output. The
//! session reconnects on its own, so the loop only ends on interrupt or when
//! the reconnect budget is spent.

use std::fs::File;
use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use cosmoid_core::{ClientEvent, ConnectionLog, StoreEvent};
use tokio::sync::mpsc;

use super::CommandContext;
use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, format_roster_text, format_store_event_json, format_telemetry_line,
};
use crate::style;
use crate::util;

/// Arguments for the watch command.
pub struct WatchArgs {
    /// Devices whose changes are shown; empty shows all.
    pub devices: Vec<String>,
    /// Query info and button state for newly listed devices.
    pub auto_query: bool,
}

impl WatchArgs {
    fn shows(&self, device_id: &str) -> bool {
        self.devices.is_empty() || self.devices.iter().any(|d| d == device_id)
    }
}

pub async fn cmd_watch(ctx: &CommandContext, args: WatchArgs) -> Result<()> {
    let mut session = util::spawn_session(&ctx.client, args.auto_query)?;

    let (store_tx, mut store_rx) = mpsc::unbounded_channel();
    session.store.events().subscribe(move |event: &StoreEvent| {
        let _ = store_tx.send(event.clone());
    });

    let mut out: Box<dyn Write> = match &ctx.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout()),
    };

    let mut log = ConnectionLog::new();
    let show_log = !ctx.quiet && ctx.format == OutputFormat::Text;
    let json_opts = ctx.opts.with_compact(true);

    if show_log {
        eprintln!(
            "{}",
            style::format_info(
                &format!("Watching {} (Ctrl-C to stop)", ctx.client.url),
                ctx.opts.no_color
            )
        );
    }
    session.bridge.connect()?;

    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    let mut failure = None;
    loop {
        tokio::select! {
            _ = &mut interrupted => break,
            Some(event) = session.events.recv() => {
                if log.record(&event)
                    && show_log
                    && let Some(entry) = log.latest()
                {
                    eprintln!("{}", style::format_log_entry(entry, ctx.opts.no_color));
                }
                if let ClientEvent::ConnectionFailed { reason } = event {
                    failure = Some(reason);
                    break;
                }
            }
            Some(event) = store_rx.recv() => {
                let content = match ctx.format {
                    OutputFormat::Json => render_json(&event, &args, &json_opts)?,
                    OutputFormat::Text => render_text(&event, &args, &ctx.opts),
                };
                if let Some(content) = content {
                    out.write_all(content.as_bytes())?;
                    out.flush()?;
                }
            }
        }
    }

    session.bridge.shutdown().await?;
    if let Some(reason) = failure {
        bail!(reason);
    }
    if show_log {
        eprintln!("{}", style::format_info("Stopped watching", ctx.opts.no_color));
    }
    Ok(())
}

fn render_json(event: &StoreEvent, args: &WatchArgs, opts: &FormatOptions) -> Result<Option<String>> {
    if event_device(event).is_some_and(|id| !args.shows(id)) {
        return Ok(None);
    }
    format_store_event_json(event, opts)
}

fn render_text(event: &StoreEvent, args: &WatchArgs, opts: &FormatOptions) -> Option<String> {
    if event_device(event).is_some_and(|id| !args.shows(id)) {
        return None;
    }
    match event {
        StoreEvent::RosterChanged(devices) => Some(format!(
            "{}\n{}",
            style::format_title(&format!("Roster: {} device(s)", devices.len()), opts.no_color),
            format_roster_text(devices, opts)
        )),
        StoreEvent::DeviceUpdated(device) => {
            let mut line = format!("{} updated", device.id);
            if let Some(serial) = &device.serial_number {
                line.push_str(&format!("  serial={serial}"));
            }
            if let Some(battery) = device.battery_level {
                line.push_str(&format!(
                    "  battery={}",
                    style::format_battery_colored(battery, opts.no_color)
                ));
            }
            Some(line + "\n")
        }
        StoreEvent::TelemetryChanged {
            device_id,
            telemetry,
        } => Some(format_telemetry_line(device_id, telemetry, opts) + "\n"),
        StoreEvent::Error { message, .. } => {
            Some(style::format_warning(message, opts.no_color) + "\n")
        }
        _ => None,
    }
}

/// The device a store change concerns, if it concerns exactly one.
fn event_device(event: &StoreEvent) -> Option<&str> {
    match event {
        StoreEvent::DeviceUpdated(device) => Some(device.id.as_str()),
        StoreEvent::TelemetryChanged { device_id, .. } => Some(device_id.as_str()),
        StoreEvent::Error { device_id, .. } => device_id.as_deref(),
        _ => None,
    }
}
