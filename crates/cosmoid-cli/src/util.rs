//! Shared helpers for bridge sessions and output.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use cosmoid_core::{
    BridgeHandle, BridgeSession, ClientConfig, ClientEvent, ConnectionState, DeviceStateStore,
    Inbound, SessionOptions,
};
use tokio::sync::mpsc;

/// A running session with its event feed and state store.
pub struct Session {
    pub bridge: BridgeHandle,
    pub store: DeviceStateStore,
    pub events: mpsc::UnboundedReceiver<ClientEvent>,
}

/// Spawn a session and subscribe to it without connecting.
///
/// The store is attached before the event feed, so by the time a frame
/// reaches `events` the store has already applied it.
pub fn spawn_session(client: &ClientConfig, auto_query: bool) -> Result<Session> {
    let bridge = BridgeSession::spawn(
        client.clone(),
        SessionOptions::default().auto_query(auto_query),
    )
    .context("Failed to start bridge session")?;

    let store = DeviceStateStore::new();
    store.attach(bridge.events());

    let (tx, events) = mpsc::unbounded_channel();
    bridge.events().subscribe(move |event: &ClientEvent| {
        let _ = tx.send(event.clone());
    });

    Ok(Session {
        bridge,
        store,
        events,
    })
}

/// Connect and wait until the connection is open.
pub async fn open(session: &mut Session, url: &str, timeout: Duration) -> Result<()> {
    session.bridge.connect()?;

    let state = tokio::time::timeout(
        timeout,
        session
            .bridge
            .wait_for_state(|s| matches!(s, ConnectionState::Open | ConnectionState::Failed)),
    )
    .await
    .with_context(|| format!("Timed out connecting to Cosmoid Bridge at {url}"))??;

    if state == ConnectionState::Failed {
        let reason = failure_reason(&mut session.events)
            .unwrap_or_else(|| format!("Unable to reach Cosmoid Bridge at {url}"));
        bail!(reason);
    }
    tracing::debug!(url, "Bridge connection open");
    Ok(())
}

fn failure_reason(events: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Option<String> {
    let mut reason = None;
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::ConnectionFailed { reason: r } = event {
            reason = Some(r);
        }
    }
    reason
}

/// Wait for the first frame `pick` accepts.
///
/// `pick` returns `Some(Ok(_))` to accept a frame, `Some(Err(_))` to fail
/// and `None` to keep waiting.
pub async fn await_reply<T>(
    events: &mut mpsc::UnboundedReceiver<ClientEvent>,
    timeout: Duration,
    mut pick: impl FnMut(&Inbound) -> Option<Result<T>>,
) -> Result<T> {
    let wait = async {
        while let Some(event) = events.recv().await {
            match event {
                ClientEvent::Message(inbound) => {
                    if let Some(outcome) = pick(&inbound) {
                        return outcome;
                    }
                }
                ClientEvent::ConnectionFailed { reason } => bail!(reason),
                ClientEvent::Disconnected { reason } => {
                    tracing::warn!(%reason, "Bridge connection dropped while waiting");
                }
                _ => {}
            }
        }
        bail!("Bridge session ended")
    };
    tokio::time::timeout(timeout, wait)
        .await
        .context("Timed out waiting for the bridge to answer")?
}

/// A bridge-reported failure concerning `device_id`, if `inbound` is one.
pub fn bridge_error(inbound: &Inbound, device_id: &str) -> Option<anyhow::Error> {
    let concerns = |id: &Option<String>| id.as_deref().is_none_or(|id| id == device_id);
    match inbound {
        Inbound::Error {
            error,
            device_id: id,
            operation,
        } if concerns(id) => Some(match operation {
            Some(op) => anyhow!("Bridge reported an error during {op}: {error}"),
            None => anyhow!("Bridge reported an error: {error}"),
        }),
        Inbound::EventResult {
            error: Some(error),
            device_id: id,
            ..
        } if concerns(id) => Some(anyhow!("Bridge reported an error: {error}")),
        _ => None,
    }
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_frame(device_id: Option<&str>) -> Inbound {
        Inbound::Error {
            error: "GATT timeout".to_string(),
            device_id: device_id.map(str::to_string),
            operation: Some("readCharacteristic".to_string()),
        }
    }

    #[test]
    fn test_bridge_error_matches_device_or_global() {
        let err = bridge_error(&error_frame(Some("dev-1")), "dev-1").unwrap();
        assert_eq!(
            err.to_string(),
            "Bridge reported an error during readCharacteristic: GATT timeout"
        );
        assert!(bridge_error(&error_frame(None), "dev-1").is_some());
        assert!(bridge_error(&error_frame(Some("dev-2")), "dev-1").is_none());
    }

    #[test]
    fn test_bridge_error_from_event_result() {
        let failed = Inbound::EventResult {
            device_id: Some("dev-1".to_string()),
            result: None,
            error: Some("not connected".to_string()),
        };
        assert!(bridge_error(&failed, "dev-1").is_some());

        let ok = Inbound::EventResult {
            device_id: Some("dev-1".to_string()),
            result: Some(serde_json::json!(true)),
            error: None,
        };
        assert!(bridge_error(&ok, "dev-1").is_none());
    }

    #[tokio::test]
    async fn test_await_reply_skips_unrelated_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ClientEvent::Connected).unwrap();
        tx.send(ClientEvent::Message(Inbound::DeviceConnected {
            device_id: "dev-2".to_string(),
        }))
        .unwrap();
        tx.send(ClientEvent::Message(Inbound::DeviceConnected {
            device_id: "dev-1".to_string(),
        }))
        .unwrap();

        let id = await_reply(&mut rx, Duration::from_secs(1), |inbound| match inbound {
            Inbound::DeviceConnected { device_id } if device_id == "dev-1" => {
                Some(Ok(device_id.clone()))
            }
            _ => None,
        })
        .await
        .unwrap();
        assert_eq!(id, "dev-1");
    }

    #[tokio::test]
    async fn test_await_reply_fails_on_connection_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(ClientEvent::ConnectionFailed {
            reason: "gone".to_string(),
        })
        .unwrap();
        let err = await_reply(&mut rx, Duration::from_secs(1), |_| Some(Ok(())))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "gone");
    }

    #[tokio::test]
    async fn test_await_reply_times_out() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
        let err = await_reply(&mut rx, Duration::from_millis(20), |_| Some(Ok(())))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Timed out"));
    }
}
