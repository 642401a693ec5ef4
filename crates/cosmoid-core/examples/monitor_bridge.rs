//! Example: Monitoring a Cosmoid Bridge
//!
//! This example connects to a bridge, prints the roster whenever it changes
//! and prints button and pressure telemetry until Ctrl-C.
//!
//! Run with: `cargo run --example monitor_bridge -- [ws://HOST:PORT]`

use std::env;

use cosmoid_core::{
    BridgeSession, ClientConfig, ClientEvent, DEFAULT_BRIDGE_URL, DeviceStateStore,
    SessionOptions, StoreEvent,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let url = env::args().nth(1).unwrap_or_else(|| DEFAULT_BRIDGE_URL.to_string());
    println!("Connecting to {}...", url);

    let bridge = BridgeSession::spawn(ClientConfig::new(url), SessionOptions::default())?;

    bridge.events().subscribe(|event: &ClientEvent| match event {
        ClientEvent::Connected => println!("Connected!"),
        ClientEvent::ReconnectScheduled { attempt, delay } => {
            println!("Reconnecting in {:?} (attempt {})", delay, attempt)
        }
        ClientEvent::ConnectionFailed { reason } => eprintln!("Giving up: {}", reason),
        _ => {}
    });

    let store = DeviceStateStore::new();
    store.attach(bridge.events());
    store.events().subscribe(|event: &StoreEvent| match event {
        StoreEvent::RosterChanged(devices) => {
            println!("Found {} device(s):", devices.len());
            for device in devices.iter() {
                println!("  {}", device);
            }
        }
        StoreEvent::TelemetryChanged {
            device_id,
            telemetry,
        } => {
            println!(
                "{}: button={} press={:?}",
                device_id,
                if telemetry.is_pressed() { "down" } else { "up" },
                telemetry.press_value
            );
        }
        _ => {}
    });

    bridge.connect()?;

    tokio::signal::ctrl_c().await?;
    println!("Shutting down...");
    bridge.shutdown().await?;

    Ok(())
}
