//! Delivery of device notifications through a configured channel.

pub mod models;
pub mod senders;
pub mod service;

pub use models::{ChannelConfig, NotificationMessage};
pub use service::{NotificationError, NotificationService};
