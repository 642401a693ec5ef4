//! Connect, colour and luminosity commands.

use anyhow::Result;
use cosmoid_core::Inbound;
use cosmoid_core::commands::{
    encode_set_color, encode_set_luminosity, encode_write_color, encode_write_luminosity,
};

use super::{CommandContext, report_sent, send_one, with_session};
use crate::util::{await_reply, bridge_error, open};

pub async fn cmd_connect(ctx: &CommandContext, device_id: &str) -> Result<()> {
    let request = cosmoid_core::commands::encode_connect(device_id)?;

    with_session(ctx, false, async |session| {
        open(session, &ctx.client.url, ctx.timeout).await?;
        session.bridge.send(request.clone())?;
        await_reply(&mut session.events, ctx.timeout, |inbound| match inbound {
            Inbound::DeviceConnected { device_id: id } if id == device_id => Some(Ok(())),
            Inbound::Connected { device_id: Some(id) } if id == device_id => Some(Ok(())),
            other => bridge_error(other, device_id).map(Err),
        })
        .await
    })
    .await?;

    report_sent(ctx, &request, &format!("Bridge connected to {device_id}"))
}

pub async fn cmd_color(
    ctx: &CommandContext,
    device_id: &str,
    (red, green, blue): (u8, u8, u8),
    raw: bool,
) -> Result<()> {
    // Encode first so invalid input never opens a connection.
    let request = if raw {
        encode_write_color(device_id, red, green, blue)?
    } else {
        encode_set_color(device_id, red, green, blue)?
    };
    send_one(ctx, request.clone()).await?;
    report_sent(
        ctx,
        &request,
        &format!("Colour ({red}, {green}, {blue}) sent to {device_id}"),
    )
}

pub async fn cmd_luminosity(
    ctx: &CommandContext,
    device_id: &str,
    percent: u8,
    raw: Option<u8>,
) -> Result<()> {
    let request = match raw {
        Some(delay) => encode_write_luminosity(device_id, percent, delay)?,
        None => encode_set_luminosity(device_id, percent)?,
    };
    send_one(ctx, request.clone()).await?;
    report_sent(
        ctx,
        &request,
        &format!("Brightness {percent}% sent to {device_id}"),
    )
}
