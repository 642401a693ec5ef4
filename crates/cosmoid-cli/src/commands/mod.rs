//! Command implementations for the CLI.

mod characteristic;
mod config;
mod control;
mod devices;
mod watch;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use cosmoid_core::{ClientConfig, Outbound};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::format::FormatOptions;
use crate::style;
use crate::util::{self, Session};

pub use characteristic::{cmd_read, cmd_write};
pub use config::cmd_config;
pub use control::{cmd_color, cmd_connect, cmd_luminosity};
pub use devices::{cmd_devices, cmd_info};
pub use watch::{WatchArgs, cmd_watch};

/// Settings shared by every bridge command.
pub struct CommandContext {
    pub client: ClientConfig,
    pub timeout: Duration,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub quiet: bool,
    pub opts: FormatOptions,
}

/// Run `body` against a fresh session and shut the session down afterwards,
/// whatever `body` returned.
async fn with_session<T>(
    ctx: &CommandContext,
    auto_query: bool,
    body: impl AsyncFnOnce(&mut Session) -> Result<T>,
) -> Result<T> {
    let mut session = util::spawn_session(&ctx.client, auto_query)?;
    let outcome = body(&mut session).await;
    if let Err(e) = session.bridge.shutdown().await {
        tracing::warn!(error = %e, "Bridge session did not shut down cleanly");
    }
    outcome
}

/// Deliver one request: queue it, connect, and shut down once it is flushed.
async fn send_one(ctx: &CommandContext, request: Outbound) -> Result<()> {
    with_session(ctx, false, async |session| {
        // Held in the outbound queue until the socket opens.
        session.bridge.send(request)?;
        util::open(session, &ctx.client.url, ctx.timeout).await
    })
    .await
}

/// Confirm a request that has no reply.
fn report_sent(ctx: &CommandContext, request: &Outbound, summary: &str) -> Result<()> {
    #[derive(Serialize)]
    struct Sent<'a> {
        status: &'static str,
        request: &'a Outbound,
    }

    let content = match ctx.format {
        OutputFormat::Json => ctx.opts.as_json(&Sent {
            status: "sent",
            request,
        })?,
        OutputFormat::Text if ctx.quiet => return Ok(()),
        OutputFormat::Text => format!("{}\n", style::format_success(summary, ctx.opts.no_color)),
    };
    util::write_output(ctx.output.as_ref(), &content)
}
