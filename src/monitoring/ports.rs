//! Seams between the monitor cycle and its collaborators.

use async_trait::async_trait;

use super::error::PersistenceError;
use crate::db::entities::monitor_device;
use crate::db::models::DeviceUpdate;
use crate::notifications::service::NotificationError;

#[async_trait]
pub trait DeviceStore: Send + Sync {
    /// Devices whose daily window contains `time_utc` (HHMM, both ends inclusive).
    async fn get_active_devices(
        &self,
        time_utc: i32,
    ) -> Result<Vec<monitor_device::Model>, PersistenceError>;

    /// Deletes all `ids` as one batch, returning the number of rows removed.
    async fn delete_devices(&self, ids: &[i32]) -> Result<u64, PersistenceError>;

    /// Applies every partial update atomically.
    async fn update_devices(&self, updates: Vec<DeviceUpdate>) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait DeviceNotifier: Send + Sync {
    /// Sends one notification per device. Delivery is best-effort per
    /// recipient; the call fails only when the channel itself is unreachable.
    async fn notify(&self, devices: &[monitor_device::Model]) -> Result<(), NotificationError>;
}
