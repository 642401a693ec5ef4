//! Roster and device info commands.

use anyhow::Result;
use cosmoid_core::{Device, Inbound};

use super::{CommandContext, with_session};
use crate::cli::OutputFormat;
use crate::format::{format_device_text, format_roster_json, format_roster_text};
use crate::util::{await_reply, bridge_error, open, write_output};

pub async fn cmd_devices(ctx: &CommandContext) -> Result<()> {
    let devices = with_session(ctx, false, async |session| {
        open(session, &ctx.client.url, ctx.timeout).await?;
        // The session enumerates on open; wait for the answer.
        await_reply(&mut session.events, ctx.timeout, |inbound| match inbound {
            Inbound::DevicesList { .. } => Some(Ok(())),
            _ => None,
        })
        .await?;
        Ok(session.store.roster().to_vec())
    })
    .await?;

    let content = match ctx.format {
        OutputFormat::Json => format_roster_json(&devices, &ctx.opts)?,
        OutputFormat::Text => format_roster_text(&devices, &ctx.opts),
    };
    write_output(ctx.output.as_ref(), &content)
}

pub async fn cmd_info(ctx: &CommandContext, device_id: &str) -> Result<()> {
    let device = with_session(ctx, false, async |session| {
        open(session, &ctx.client.url, ctx.timeout).await?;
        session.bridge.get_device_info(device_id)?;

        let reported = await_reply(&mut session.events, ctx.timeout, |inbound| match inbound {
            Inbound::DeviceInfo { device_id: id, .. } if id == device_id => {
                Some(Ok(device_from_info(inbound)))
            }
            other => bridge_error(other, device_id).map(Err),
        })
        .await?;

        // Prefer the roster entry, which carries the name and merged fields.
        Ok(session.store.device(device_id).unwrap_or(reported))
    })
    .await?;

    let content = match ctx.format {
        OutputFormat::Json => ctx.opts.as_json(&device)?,
        OutputFormat::Text => format_device_text(&device, &ctx.opts),
    };
    write_output(ctx.output.as_ref(), &content)
}

/// Build a device from a `deviceInfo` frame for ids missing from the roster.
fn device_from_info(inbound: &Inbound) -> Device {
    let Inbound::DeviceInfo {
        device_id,
        serial_number,
        firmware_revision,
        hardware_revision,
        battery_level,
        connected,
        rssi,
    } = inbound
    else {
        return Device::default();
    };

    let mut device = Device::new(device_id.as_str(), device_id.as_str());
    device.serial_number = serial_number.clone();
    device.firmware_revision = firmware_revision.clone();
    device.hardware_revision = hardware_revision.clone();
    device.battery_level = *battery_level;
    device.connected = connected.unwrap_or_default();
    device.rssi = rssi.unwrap_or_default();
    device
}
