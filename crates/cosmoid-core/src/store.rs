//! Device roster and telemetry reconciliation.
//!
//! [`DeviceStateStore`] reduces bridge frames into the state a UI renders:
//! the roster (`Arc<Vec<Device>>`) and per-device [`DeviceTelemetry`]. Every
//! reducer compares before it writes and only notifies when something
//! actually changed, so consumers can re-render on every [`StoreEvent`].
//!
//! The roster comparison is positional and looks at `id` and `name` only. An
//! unchanged roster keeps the same `Arc`, which callers may check with
//! [`Arc::ptr_eq`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace, warn};
use uuid::Uuid;

use cosmoid_types::uuid::{self as uuids, Operation};
use cosmoid_types::{Device, DeviceTelemetry, Inbound, LookupResult};

use crate::error::{ErrorKind, ProtocolError};
use crate::events::{ClientEvent, ListenerRegistry, Subscription};

/// Changes published by the store.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum StoreEvent {
    /// The roster was replaced.
    RosterChanged(Arc<Vec<Device>>),
    /// Informational fields of one roster entry changed.
    DeviceUpdated(Device),
    /// A telemetry value changed.
    TelemetryChanged {
        device_id: String,
        telemetry: DeviceTelemetry,
    },
    /// A reportable, non-fatal condition.
    Error {
        kind: ErrorKind,
        message: String,
        device_id: Option<String>,
        operation: Option<String>,
    },
}

#[derive(Debug, Default)]
struct State {
    roster: Arc<Vec<Device>>,
    telemetry: HashMap<String, DeviceTelemetry>,
}

/// Resolve a characteristic identifier to the operation whose state it feeds.
///
/// The standard battery level characteristic is treated as the custom one.
fn resolve_operation(characteristic: &str) -> LookupResult<Operation> {
    let uuid: Uuid = uuids::parse_uuid(characteristic)?;
    if uuid == uuids::BATTERY_LEVEL {
        return Ok(Operation::ReadBatteryLevel);
    }
    Operation::from_uuid(uuid)
}

/// Drop repeated ids, keeping the first entry for each.
fn dedup_roster(devices: &[Device]) -> Vec<Device> {
    let mut seen = HashSet::new();
    let mut roster = Vec::with_capacity(devices.len());
    for device in devices {
        if seen.insert(device.id.as_str()) {
            roster.push(device.clone());
        } else {
            warn!(device_id = %device.id, "Duplicate device in roster, keeping first entry");
        }
    }
    roster
}

fn roster_differs(previous: &[Device], incoming: &[Device]) -> bool {
    previous.len() != incoming.len()
        || previous
            .iter()
            .zip(incoming)
            .any(|(old, new)| !old.same_identity(new))
}

/// Overwrite `slot` with a known, different value.
fn merge<T: PartialEq>(slot: &mut T, incoming: Option<T>) -> bool {
    match incoming {
        Some(value) if *slot != value => {
            *slot = value;
            true
        }
        _ => false,
    }
}

fn error_event(
    kind: ErrorKind,
    message: impl Into<String>,
    device_id: Option<&str>,
    operation: Option<&str>,
) -> StoreEvent {
    StoreEvent::Error {
        kind,
        message: message.into(),
        device_id: device_id.map(str::to_string),
        operation: operation.map(str::to_string),
    }
}

impl State {
    fn apply(&mut self, inbound: &Inbound) -> Vec<StoreEvent> {
        match inbound {
            Inbound::DevicesList { devices } => self.apply_roster(devices),
            Inbound::DeviceInfo {
                device_id,
                serial_number,
                firmware_revision,
                hardware_revision,
                battery_level,
                connected,
                rssi,
            } => self.update_device(device_id, |device| {
                let changed = [
                    merge(&mut device.serial_number, serial_number.clone().map(Some)),
                    merge(&mut device.firmware_revision, firmware_revision.clone().map(Some)),
                    merge(&mut device.hardware_revision, hardware_revision.clone().map(Some)),
                    merge(&mut device.battery_level, battery_level.map(Some)),
                    merge(&mut device.connected, *connected),
                    merge(&mut device.rssi, *rssi),
                ];
                changed.contains(&true)
            }),
            Inbound::DeviceConnected { device_id }
            | Inbound::Connected {
                device_id: Some(device_id),
            } => self.update_device(device_id, |device| {
                !std::mem::replace(&mut device.connected, true)
            }),
            Inbound::Disconnected {
                device_id: Some(device_id),
            } => {
                let mut events = self.update_device(device_id, |device| {
                    std::mem::replace(&mut device.connected, false)
                });
                if self.telemetry.remove(device_id).is_some() {
                    events.push(StoreEvent::TelemetryChanged {
                        device_id: device_id.clone(),
                        telemetry: DeviceTelemetry::default(),
                    });
                }
                events
            }
            Inbound::CharacteristicChanged {
                device_id,
                characteristic_uuid,
                value,
            } => self.apply_characteristic(device_id, characteristic_uuid, value),
            Inbound::Error {
                error,
                device_id,
                operation,
            } => vec![error_event(
                ErrorKind::Bridge,
                error.clone(),
                device_id.as_deref(),
                operation.as_deref(),
            )],
            Inbound::EventResult {
                device_id,
                error: Some(error),
                ..
            } => vec![error_event(
                ErrorKind::Bridge,
                error.clone(),
                device_id.as_deref(),
                None,
            )],
            Inbound::Connected { device_id: None }
            | Inbound::Disconnected { device_id: None }
            | Inbound::EventResult { error: None, .. } => Vec::new(),
        }
    }

    fn apply_roster(&mut self, devices: &[Device]) -> Vec<StoreEvent> {
        let incoming = dedup_roster(devices);
        if !roster_differs(&self.roster, &incoming) {
            trace!(devices = incoming.len(), "Roster unchanged");
            return Vec::new();
        }
        debug!(devices = incoming.len(), "Roster replaced");
        self.roster = Arc::new(incoming);
        vec![StoreEvent::RosterChanged(Arc::clone(&self.roster))]
    }

    /// Apply `edit` to the roster entry for `device_id`. `edit` returns
    /// whether it changed anything; unknown devices are skipped.
    fn update_device(
        &mut self,
        device_id: &str,
        edit: impl FnOnce(&mut Device) -> bool,
    ) -> Vec<StoreEvent> {
        let Some(index) = self.roster.iter().position(|d| d.id == device_id) else {
            debug!(device_id, "Dropping update for device not in roster");
            return Vec::new();
        };

        let mut device = self.roster[index].clone();
        if !edit(&mut device) {
            trace!(device_id, "Device update suppressed, nothing changed");
            return Vec::new();
        }
        Arc::make_mut(&mut self.roster)[index] = device.clone();
        vec![StoreEvent::DeviceUpdated(device)]
    }

    fn apply_characteristic(
        &mut self,
        device_id: &str,
        characteristic: &str,
        value: &[u8],
    ) -> Vec<StoreEvent> {
        let operation = match resolve_operation(characteristic) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(device_id, characteristic, error = %e, "Unresolvable characteristic");
                return vec![error_event(ErrorKind::Lookup, e.to_string(), Some(device_id), None)];
            }
        };

        let Some(&byte) = value.first() else {
            let err = ProtocolError::EmptyValue {
                device_id: device_id.to_string(),
                characteristic: characteristic.to_string(),
            };
            return vec![error_event(
                ErrorKind::Protocol,
                err.to_string(),
                Some(device_id),
                Some(operation.as_str()),
            )];
        };

        if !self.roster.iter().any(|d| d.id == device_id) {
            debug!(device_id, %operation, "Dropping telemetry for device not in roster");
            return Vec::new();
        }

        match operation {
            Operation::ReadButtonStatus | Operation::ReadSensorValue => {
                let telemetry = self.telemetry.entry(device_id.to_string()).or_default();
                let field = if operation == Operation::ReadButtonStatus {
                    &mut telemetry.button_status
                } else {
                    &mut telemetry.press_value
                };
                if *field == Some(byte) {
                    trace!(device_id, %operation, value = byte, "Telemetry unchanged");
                    return Vec::new();
                }
                *field = Some(byte);
                vec![StoreEvent::TelemetryChanged {
                    device_id: device_id.to_string(),
                    telemetry: telemetry.clone(),
                }]
            }
            Operation::ReadBatteryLevel => self.update_device(device_id, |device| {
                device.battery_level.replace(byte) != Some(byte)
            }),
            _ => {
                trace!(device_id, %operation, "Characteristic carries no tracked state");
                Vec::new()
            }
        }
    }
}

/// Reconciled, de-duplicated view of the bridge's devices.
///
/// Cloning yields another handle to the same state and listeners.
#[derive(Debug, Clone, Default)]
pub struct DeviceStateStore {
    state: Arc<Mutex<State>>,
    events: ListenerRegistry<StoreEvent>,
}

impl DeviceStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Listeners for store changes.
    pub fn events(&self) -> &ListenerRegistry<StoreEvent> {
        &self.events
    }

    /// Feed this store from a client's notifications.
    pub fn attach(&self, client_events: &ListenerRegistry<ClientEvent>) -> Subscription {
        let store = self.clone();
        client_events.subscribe(move |event| store.handle_client_event(event))
    }

    /// React to one client notification.
    pub fn handle_client_event(&self, event: &ClientEvent) {
        match event {
            ClientEvent::Message(inbound) => self.reduce(inbound),
            ClientEvent::Disconnected { .. } => self.clear(),
            _ => {}
        }
    }

    /// Reduce one inbound frame and notify listeners of what changed.
    pub fn reduce(&self, inbound: &Inbound) {
        let changes = self.lock().apply(inbound);
        for change in &changes {
            self.events.notify(change);
        }
    }

    /// Forget the roster and all telemetry.
    pub fn clear(&self) {
        let changed = {
            let mut state = self.lock();
            state.telemetry.clear();
            if state.roster.is_empty() {
                false
            } else {
                state.roster = Arc::new(Vec::new());
                true
            }
        };
        if changed {
            self.events.notify(&StoreEvent::RosterChanged(self.roster()));
        }
    }

    /// The current roster.
    pub fn roster(&self) -> Arc<Vec<Device>> {
        Arc::clone(&self.lock().roster)
    }

    /// One roster entry.
    pub fn device(&self, device_id: &str) -> Option<Device> {
        self.lock().roster.iter().find(|d| d.id == device_id).cloned()
    }

    /// Telemetry for one device, once any has arrived.
    pub fn telemetry(&self, device_id: &str) -> Option<DeviceTelemetry> {
        self.lock().telemetry.get(device_id).cloned()
    }
}
