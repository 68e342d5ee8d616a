//! Database access functions, grouped by entity, plus the SeaORM-backed
//! store consumed by the monitor cycle.

pub mod monitor_device_service;

pub use monitor_device_service::*;

/// A fresh in-memory SQLite database with the schema applied.
#[cfg(test)]
pub(crate) async fn test_db() -> sea_orm::DatabaseConnection {
    let mut options = sea_orm::ConnectOptions::new("sqlite::memory:");
    // Every pooled connection would otherwise see its own empty database.
    options.max_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await.unwrap();
    ensure_schema(&db).await.unwrap();
    db
}
