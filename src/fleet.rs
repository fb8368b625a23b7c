//! Fleet registry: the controller-side view of every node on the bus.
//!
//! A controller (or a monitoring tool) feeds every envelope it sees into
//! [`DeviceRegistry::observe`] and calls [`DeviceRegistry::expire`]
//! periodically. Devices that have gone quiet for longer than the timeout
//! are marked `"Disconnected"` and `OFF`.
//!
//! # Example
//!
//! ```rust
//! use light_node::codec::decode;
//! use light_node::fleet::DeviceRegistry;
//! use light_node::SwitchState;
//!
//! let mut fleet: DeviceRegistry<8> = DeviceRegistry::new();
//! let echo = decode(br#"{"type":"com","device":"ESP32-2","status":"Connected","state":"ON","message":"heartbeat"}"#).unwrap();
//!
//! assert_eq!(fleet.observe(&echo, 0), Ok(true));
//! assert_eq!(fleet.get("ESP32-2").unwrap().state, SwitchState::On);
//!
//! let gone = fleet.expire(10_001);
//! assert_eq!(gone.len(), 1);
//! assert_eq!(fleet.get("ESP32-2").unwrap().state, SwitchState::Off);
//! ```

use crate::config::bounded_string;
use crate::envelope::{Envelope, Id};
use crate::traits::SwitchState;
use heapless::{FnvIndexMap, Vec as HVec};
use thiserror::Error;

/// Silence after which a device is considered gone.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Status recorded for an expired device.
pub const DISCONNECTED: &str = "Disconnected";

/// Last known facts about one device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Reported liveness status.
    pub status: Id,
    /// Reported light state.
    pub state: SwitchState,
    /// Time of the last envelope from this device.
    pub last_seen_ms: u64,
}

/// The registry has no room for another device.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("device registry is full")]
pub struct RegistryFull;

/// Bounded table of devices keyed by id.
///
/// `N` must be a power of two.
pub struct DeviceRegistry<const N: usize> {
    devices: FnvIndexMap<Id, DeviceRecord, N>,
    timeout_ms: u64,
}

impl<const N: usize> DeviceRegistry<N> {
    /// Create an empty registry with the default timeout.
    pub fn new() -> Self {
        Self::with_timeout_ms(DEFAULT_TIMEOUT_MS)
    }

    /// Create an empty registry with a custom timeout.
    pub fn with_timeout_ms(timeout_ms: u64) -> Self {
        Self {
            devices: FnvIndexMap::new(),
            timeout_ms,
        }
    }

    /// Record an envelope.
    ///
    /// Only envelopes naming a concrete device and carrying both `status`
    /// and `state` are recorded. Returns whether the stored status or
    /// state changed (a new device counts as a change).
    pub fn observe(&mut self, envelope: &Envelope, now_ms: u64) -> Result<bool, RegistryFull> {
        let (Some(device), Some(status), Some(state)) = (
            envelope.device.device_id(),
            envelope.status.as_ref(),
            envelope.state,
        ) else {
            return Ok(false);
        };

        let id: Id = bounded_string(device);
        if let Some(record) = self.devices.get_mut(&id) {
            let changed = record.status != *status || record.state != state;
            record.status = status.clone();
            record.state = state;
            record.last_seen_ms = now_ms;
            return Ok(changed);
        }

        let record = DeviceRecord {
            status: status.clone(),
            state,
            last_seen_ms: now_ms,
        };
        self.devices.insert(id, record).map_err(|_| RegistryFull)?;
        tracing::info!(device, "device discovered");
        Ok(true)
    }

    /// Mark devices silent for longer than the timeout as disconnected.
    ///
    /// Returns the ids that expired on this call.
    pub fn expire(&mut self, now_ms: u64) -> HVec<Id, N> {
        let mut expired = HVec::new();
        for (id, record) in self.devices.iter_mut() {
            if record.status.as_str() == DISCONNECTED {
                continue;
            }
            if now_ms.saturating_sub(record.last_seen_ms) > self.timeout_ms {
                tracing::info!(device = id.as_str(), "device timed out");
                record.status = bounded_string(DISCONNECTED);
                record.state = SwitchState::Off;
                // Capacity matches the map, so this cannot overflow.
                let _ = expired.push(id.clone());
            }
        }
        expired
    }

    /// Look up a device.
    pub fn get(&self, device_id: &str) -> Option<&DeviceRecord> {
        let id: Id = bounded_string(device_id);
        self.devices.get(&id)
    }

    /// Iterate over every known device.
    pub fn iter(&self) -> impl Iterator<Item = (&Id, &DeviceRecord)> {
        self.devices.iter()
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device has been seen.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Ids of devices whose light is reported on.
    pub fn lit(&self) -> impl Iterator<Item = &Id> {
        self.devices
            .iter()
            .filter(|(_, r)| r.state.is_on())
            .map(|(id, _)| id)
    }
}

impl<const N: usize> Default for DeviceRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
