//! Platform-agnostic types for Cosmoid force-sensing peripherals.
//!
//! This crate provides the data model shared by the bridge client
//! (cosmoid-core) and any other consumer of the bridge protocol.
//!
//! # Features
//!
//! - Device roster and telemetry structures
//! - The connection state machine's states and legal edges
//! - The characteristic catalogue (UUID constants and operation lookup)
//! - Inbound and outbound protocol envelopes
//!
//! # Example
//!
//! ```
//! use cosmoid_types::uuid::{Operation, get_operation, get_uuid};
//!
//! let uuid = get_uuid("READ_BUTTON_STATUS").unwrap();
//! assert_eq!(get_operation(&uuid.simple().to_string()).unwrap(), Operation::ReadButtonStatus);
//! ```

pub mod error;
pub mod protocol;
pub mod types;
pub mod uuid;

pub use error::{LookupError, LookupResult};
pub use protocol::{Inbound, Outbound};
pub use types::{ConnectionState, Device, DeviceTelemetry};
pub use uuid::Operation;
pub use uuid as uuids;
