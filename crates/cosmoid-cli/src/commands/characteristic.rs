//! Raw characteristic read and write commands.

use anyhow::{Result, anyhow};
use cosmoid_core::commands::encode_write_characteristic;
use cosmoid_core::{Inbound, Operation, uuids};

use super::{CommandContext, report_sent, send_one, with_session};
use crate::cli::OutputFormat;
use crate::format::{describe_value, format_bytes, format_characteristic_json};
use crate::util::{await_reply, bridge_error, open, write_output};

/// Parse an operation name, listing the known names on failure.
fn parse_operation(name: &str) -> Result<Operation> {
    name.parse::<Operation>().map_err(|e| {
        let known: Vec<&str> = Operation::ALL.iter().map(|op| op.as_str()).collect();
        anyhow!("{e}. Known operations: {}", known.join(", "))
    })
}

/// Whether a notified characteristic answers a read of `operation`.
fn answers(characteristic: &str, operation: Operation) -> bool {
    uuids::parse_uuid(characteristic).is_ok_and(|uuid| {
        uuid == operation.uuid()
            || (operation == Operation::ReadBatteryLevel && uuid == uuids::BATTERY_LEVEL)
    })
}

pub async fn cmd_read(ctx: &CommandContext, device_id: &str, operation: &str) -> Result<()> {
    let operation = parse_operation(operation)?;

    let value = with_session(ctx, false, async |session| {
        open(session, &ctx.client.url, ctx.timeout).await?;
        session.bridge.read_characteristic(device_id, operation)?;
        await_reply(&mut session.events, ctx.timeout, |inbound| match inbound {
            Inbound::CharacteristicChanged {
                device_id: id,
                characteristic_uuid,
                value,
            } if id == device_id && answers(characteristic_uuid, operation) => {
                Some(Ok(value.clone()))
            }
            other => bridge_error(other, device_id).map(Err),
        })
        .await
    })
    .await?;

    let content = match ctx.format {
        OutputFormat::Json => format_characteristic_json(device_id, operation, &value, &ctx.opts)?,
        OutputFormat::Text => format!(
            "{device_id} {operation}: {} [{}]\n",
            describe_value(operation, &value),
            format_bytes(&value)
        ),
    };
    write_output(ctx.output.as_ref(), &content)
}

pub async fn cmd_write(
    ctx: &CommandContext,
    device_id: &str,
    operation: &str,
    value: Vec<u8>,
) -> Result<()> {
    let operation = parse_operation(operation)?;
    let summary = format!("Wrote [{}] to {operation} on {device_id}", format_bytes(&value));
    let request = encode_write_characteristic(device_id, operation.uuid(), value)?;
    send_one(ctx, request.clone()).await?;
    report_sent(ctx, &request, &summary)
}
