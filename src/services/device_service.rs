use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, TransactionTrait};
use thiserror::Error;
use tracing::info;

use crate::db::entities::monitor_device;
use crate::db::entities::prelude::MonitorDevice;
use crate::db::models::{DeviceUpdate, NewMonitorDevice, ValidationError, validate_device};
use crate::db::services as device_queries;

#[derive(Error, Debug)]
pub enum DeviceServiceError {
    #[error("Device #{index} in the request is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: ValidationError,
    },
    #[error("Device {0} not found")]
    NotFound(i32),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Adds, edits and removes devices in the monitor queue. Every batch is
/// validated as a whole before anything is written.
#[derive(Debug, Clone)]
pub struct DeviceService {
    db: DatabaseConnection,
}

impl DeviceService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Queues new devices, returning their ids in request order.
    pub async fn add_devices(
        &self,
        requested_by: &str,
        requests: Vec<NewMonitorDevice>,
    ) -> Result<Vec<i32>, DeviceServiceError> {
        for (index, request) in requests.iter().enumerate() {
            request
                .validate()
                .map_err(|source| DeviceServiceError::Invalid { index, source })?;
        }

        let now = Utc::now();
        let models = requests
            .into_iter()
            .map(|request| request.into_active_model(requested_by, now))
            .collect();
        let created = device_queries::create_devices(&self.db, models).await?;
        info!(requested_by, count = created.len(), "Devices queued for monitoring.");
        Ok(created.into_iter().map(|device| device.id).collect())
    }

    pub async fn get_devices(
        &self,
        ids: Option<&[i32]>,
    ) -> Result<Vec<monitor_device::Model>, DeviceServiceError> {
        Ok(device_queries::get_devices(&self.db, ids).await?)
    }

    /// Applies partial updates atomically. Each update is checked against the
    /// stored row it modifies, so a TCP device cannot lose its port.
    pub async fn update_devices(
        &self,
        updates: Vec<DeviceUpdate>,
    ) -> Result<Vec<monitor_device::Model>, DeviceServiceError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;
        let mut updated = Vec::with_capacity(updates.len());

        for (index, update) in updates.into_iter().enumerate() {
            let mut merged = MonitorDevice::find_by_id(update.id)
                .one(&txn)
                .await?
                .ok_or(DeviceServiceError::NotFound(update.id))?;
            update.apply_to(&mut merged);
            validate_device(&merged)
                .map_err(|source| DeviceServiceError::Invalid { index, source })?;
            updated.push(update.into_active_model(now).update(&txn).await?);
        }

        txn.commit().await?;
        info!(count = updated.len(), "Devices updated.");
        Ok(updated)
    }

    pub async fn remove_devices(&self, ids: &[i32]) -> Result<u64, DeviceServiceError> {
        let removed = device_queries::delete_devices(&self.db, ids).await?;
        info!(requested = ids.len(), removed, "Devices removed from monitor queue.");
        Ok(removed)
    }
}
