//! Application services sitting on top of the database layer.

pub mod device_service;

pub use device_service::{DeviceService, DeviceServiceError};
