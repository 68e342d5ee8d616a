use std::net::IpAddr;

use crate::db::entities::monitor_device;

/// Outcome of the resolve+probe sequence for one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reachability {
    /// Not probed yet, or the sequence failed. The device sits out the cycle.
    #[default]
    Unknown,
    Reachable(bool),
}

/// Per-device working state, owned by exactly one cycle and never persisted.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub device: monitor_device::Model,
    /// Set once the identifier has been resolved.
    pub current_address: Option<IpAddr>,
    pub reachability: Reachability,
    pub persistent_alarm_ended: bool,
}

impl DeviceState {
    pub fn new(device: monitor_device::Model) -> Self {
        Self {
            device,
            current_address: None,
            reachability: Reachability::Unknown,
            persistent_alarm_ended: false,
        }
    }
}
