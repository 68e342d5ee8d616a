//! Queries over the `monitor_devices` table.
//!
//! Functions that need several statements to land together take a
//! `DatabaseConnection` and run them in one transaction; single-statement
//! reads accept any connection so they can also run inside a caller's
//! transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Schema, TransactionTrait,
};
use tracing::{debug, info};

use crate::db::entities::monitor_device;
use crate::db::entities::prelude::*;
use crate::db::models::DeviceUpdate;
use crate::monitoring::error::PersistenceError;
use crate::monitoring::ports::DeviceStore;

/// Creates the `monitor_devices` table from the entity definition if it is
/// missing.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    let mut create_table = schema.create_table_from_entity(MonitorDevice);
    create_table.if_not_exists();
    db.execute(backend.build(&create_table)).await?;
    debug!(?backend, "Ensured monitor_devices table exists.");
    Ok(())
}

/// Inserts all devices in one transaction. Either every row is created or
/// none is.
pub async fn create_devices(
    db: &DatabaseConnection,
    devices: Vec<monitor_device::ActiveModel>,
) -> Result<Vec<monitor_device::Model>, DbErr> {
    let txn = db.begin().await?;
    let mut created = Vec::with_capacity(devices.len());
    for device in devices {
        created.push(device.insert(&txn).await?);
    }
    txn.commit().await?;
    info!(count = created.len(), "Added devices to monitor queue.");
    Ok(created)
}

/// All devices ordered by id, or only those whose id is in `ids`.
pub async fn get_devices<C: ConnectionTrait>(
    db: &C,
    ids: Option<&[i32]>,
) -> Result<Vec<monitor_device::Model>, DbErr> {
    let mut query = MonitorDevice::find();
    if let Some(ids) = ids {
        query = query.filter(MonitorDeviceColumn::Id.is_in(ids.iter().copied()));
    }
    query
        .order_by_asc(MonitorDeviceColumn::Id)
        .all(db)
        .await
}

/// Devices whose window `[monitor_start_utc, monitor_end_utc]` contains
/// `time_utc`. A window with start after end never matches.
pub async fn get_active_devices_for_time<C: ConnectionTrait>(
    db: &C,
    time_utc: i32,
) -> Result<Vec<monitor_device::Model>, DbErr> {
    MonitorDevice::find()
        .filter(MonitorDeviceColumn::MonitorStartUtc.lte(time_utc))
        .filter(MonitorDeviceColumn::MonitorEndUtc.gte(time_utc))
        .order_by_asc(MonitorDeviceColumn::Id)
        .all(db)
        .await
}

pub async fn delete_devices<C: ConnectionTrait>(db: &C, ids: &[i32]) -> Result<u64, DbErr> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = MonitorDevice::delete_many()
        .filter(MonitorDeviceColumn::Id.is_in(ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Applies every partial update in one transaction. An update naming a
/// missing id rolls the whole batch back.
pub async fn update_devices(
    db: &DatabaseConnection,
    updates: Vec<DeviceUpdate>,
    now: DateTime<Utc>,
) -> Result<Vec<monitor_device::Model>, DbErr> {
    let txn = db.begin().await?;
    let mut updated = Vec::with_capacity(updates.len());
    for update in updates {
        updated.push(update.into_active_model(now).update(&txn).await?);
    }
    txn.commit().await?;
    Ok(updated)
}

/// The store the monitor cycle reads its queue from and reconciles into.
#[derive(Debug, Clone)]
pub struct SeaOrmDeviceStore {
    db: DatabaseConnection,
}

impl SeaOrmDeviceStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl DeviceStore for SeaOrmDeviceStore {
    async fn get_active_devices(
        &self,
        time_utc: i32,
    ) -> Result<Vec<monitor_device::Model>, PersistenceError> {
        Ok(get_active_devices_for_time(&self.db, time_utc).await?)
    }

    async fn delete_devices(&self, ids: &[i32]) -> Result<u64, PersistenceError> {
        Ok(delete_devices(&self.db, ids).await?)
    }

    async fn update_devices(&self, updates: Vec<DeviceUpdate>) -> Result<(), PersistenceError> {
        update_devices(&self.db, updates, Utc::now()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{MonitorTrigger, Proto};
    use crate::db::models::NewMonitorDevice;
    use crate::db::services::test_db;

    fn new_device(name: &str, start: i32, end: i32) -> monitor_device::ActiveModel {
        NewMonitorDevice {
            name: name.to_string(),
            identifier: "192.0.2.10".to_string(),
            port: None,
            protocol: Proto::Icmp,
            persist: false,
            monitor_trigger: MonitorTrigger::Offline,
            monitor_start_utc: start,
            monitor_end_utc: end,
            notify: "noc@example.com".to_string(),
            email_subject: "{{ name }} down".to_string(),
            email_body: "body".to_string(),
            comments: None,
        }
        .into_active_model("tester", Utc::now())
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let db = test_db().await;
        create_devices(
            &db,
            vec![
                new_device("office-hours", 900, 1700),
                new_device("all-day", 0, 2400),
                new_device("inverted", 2200, 200),
            ],
        )
        .await
        .unwrap();

        let names = |devices: Vec<monitor_device::Model>| {
            devices.into_iter().map(|d| d.name).collect::<Vec<_>>()
        };

        let at_start = get_active_devices_for_time(&db, 900).await.unwrap();
        assert_eq!(names(at_start), vec!["office-hours", "all-day"]);

        let at_end = get_active_devices_for_time(&db, 1700).await.unwrap();
        assert_eq!(names(at_end), vec!["office-hours", "all-day"]);

        let after = get_active_devices_for_time(&db, 1701).await.unwrap();
        assert_eq!(names(after), vec!["all-day"]);

        let midnight = get_active_devices_for_time(&db, 2300).await.unwrap();
        assert_eq!(names(midnight), vec!["all-day"]);
    }

    #[tokio::test]
    async fn test_created_devices_get_defaults() {
        let db = test_db().await;
        let created = create_devices(&db, vec![new_device("router", 0, 2400)])
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        assert!(!created[0].been_notified);
        assert_eq!(created[0].requested_by, "tester");

        let stored = get_devices(&db, Some([created[0].id].as_slice())).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "router");
        assert_eq!(stored[0].protocol, Proto::Icmp);
        assert_eq!(stored[0].monitor_trigger, MonitorTrigger::Offline);
    }

    #[tokio::test]
    async fn test_delete_devices_by_id() {
        let db = test_db().await;
        let created = create_devices(
            &db,
            vec![new_device("a", 0, 2400), new_device("b", 0, 2400)],
        )
        .await
        .unwrap();

        assert_eq!(delete_devices(&db, &[]).await.unwrap(), 0);
        assert_eq!(delete_devices(&db, &[created[0].id]).await.unwrap(), 1);

        let remaining = get_devices(&db, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "b");
    }

    #[tokio::test]
    async fn test_update_batch_is_atomic() {
        let db = test_db().await;
        let created = create_devices(&db, vec![new_device("a", 0, 2400)])
            .await
            .unwrap();
        let id = created[0].id;

        let result = update_devices(
            &db,
            vec![
                DeviceUpdate::been_notified(id, true),
                DeviceUpdate::been_notified(id + 1000, true),
            ],
            Utc::now(),
        )
        .await;
        assert!(result.is_err());
        let unchanged = get_devices(&db, Some([id].as_slice())).await.unwrap();
        assert!(!unchanged[0].been_notified);

        update_devices(&db, vec![DeviceUpdate::been_notified(id, true)], Utc::now())
            .await
            .unwrap();
        let flipped = get_devices(&db, Some([id].as_slice())).await.unwrap();
        assert!(flipped[0].been_notified);
        assert_eq!(flipped[0].name, "a");
    }

    #[tokio::test]
    async fn test_store_reconciles_through_trait() {
        let db = test_db().await;
        let created = create_devices(
            &db,
            vec![new_device("one-shot", 0, 2400), new_device("persistent", 0, 2400)],
        )
        .await
        .unwrap();
        let store = SeaOrmDeviceStore::new(db.clone());

        assert_eq!(store.get_active_devices(1200).await.unwrap().len(), 2);
        assert_eq!(store.delete_devices(&[created[0].id]).await.unwrap(), 1);
        store
            .update_devices(vec![DeviceUpdate::been_notified(created[1].id, true)])
            .await
            .unwrap();

        let remaining = store.get_active_devices(1200).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].been_notified);
    }
}
