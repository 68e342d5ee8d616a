use std::io;
use std::net::IpAddr;
use thiserror::Error;

use crate::notifications::service::NotificationError;

/// DNS lookup failed for a device's identifier.
#[derive(Error, Debug)]
#[error("Failed to resolve '{identifier}': {source}")]
pub struct ResolutionError {
    pub identifier: String,
    #[source]
    pub source: io::Error,
}

/// The probing mechanism itself failed. A confirmed "unreachable" is never
/// reported through this type.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to open ICMP socket for {address}: {source}")]
    IcmpSocket {
        address: IpAddr,
        #[source]
        source: io::Error,
    },
    #[error("Ping of {address} failed: {source}")]
    Icmp {
        address: IpAddr,
        #[source]
        source: surge_ping::SurgeError,
    },
    #[error("TCP connection to {address}:{port} failed: {source}")]
    Tcp {
        address: IpAddr,
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// Why a device was excluded from the current cycle. All variants are
/// recovered locally; the device is reconsidered on its next due cycle.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("Device {device_id} uses TCP but has no valid port configured")]
    Configuration { device_id: i32 },
}

/// A store read or write batch failed.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Failures that end a monitor run early.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error("Failed to select active devices: {0}")]
    Selection(#[source] PersistenceError),
    #[error("Notification dispatch failed, reconciliation skipped: {0}")]
    Dispatch(#[source] NotificationError),
}
