//! SeaORM entities mapping the monitor tables.

pub mod monitor_device;

pub mod prelude {
    pub use super::monitor_device::Column as MonitorDeviceColumn;
    pub use super::monitor_device::Entity as MonitorDevice;
}
