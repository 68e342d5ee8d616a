//! Persistence layer for monitor devices.
//!
//! `entities` holds the SeaORM entity definitions, `enums` the active enums
//! stored in text columns, `models` the request/partial-update shapes and
//! `services` the query functions plus the store used by the monitor cycle.

pub mod entities;
pub mod enums;
pub mod models;
pub mod services;
