use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set, Unchanged};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::monitor_device;
use super::enums::{MonitorTrigger, Proto};

/// Latest valid value of a monitor window bound (24:00).
pub const WINDOW_MAX: i32 = 2400;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be between 0000 and 2400, got {value}")]
    WindowOutOfRange {
        field: &'static str,
        value: i32,
    },
    #[error("TCP devices require a port")]
    MissingPort,
    #[error("Port {0} is outside 1-65535")]
    PortOutOfRange(i32),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Request body for creating a monitor device.
///
/// `requested_by` is not part of the body; it is supplied by whoever submits
/// the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMonitorDevice {
    pub name: String,
    pub identifier: String,
    #[serde(default)]
    pub port: Option<i32>,
    #[serde(default)]
    pub protocol: Proto,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub monitor_trigger: MonitorTrigger,
    pub monitor_start_utc: i32,
    pub monitor_end_utc: i32,
    pub notify: String,
    pub email_subject: String,
    pub email_body: String,
    #[serde(default)]
    pub comments: Option<String>,
}

impl NewMonitorDevice {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(DeviceFields {
            name: &self.name,
            identifier: &self.identifier,
            notify: &self.notify,
            protocol: self.protocol,
            port: self.port,
            monitor_start_utc: self.monitor_start_utc,
            monitor_end_utc: self.monitor_end_utc,
        })
    }

    pub fn into_active_model(
        self,
        requested_by: &str,
        now: DateTime<Utc>,
    ) -> monitor_device::ActiveModel {
        monitor_device::ActiveModel {
            id: NotSet,
            name: Set(self.name),
            identifier: Set(self.identifier),
            port: Set(self.port),
            protocol: Set(self.protocol),
            persist: Set(self.persist),
            monitor_trigger: Set(self.monitor_trigger),
            monitor_start_utc: Set(self.monitor_start_utc),
            monitor_end_utc: Set(self.monitor_end_utc),
            been_notified: Set(false),
            requested_by: Set(requested_by.to_string()),
            notify: Set(self.notify),
            email_subject: Set(self.email_subject),
            email_body: Set(self.email_body),
            comments: Set(self.comments),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }
}

/// A partial update of one device. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceUpdate {
    pub id: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub port: Option<i32>,
    #[serde(default)]
    pub protocol: Option<Proto>,
    #[serde(default)]
    pub persist: Option<bool>,
    #[serde(default)]
    pub monitor_trigger: Option<MonitorTrigger>,
    #[serde(default)]
    pub monitor_start_utc: Option<i32>,
    #[serde(default)]
    pub monitor_end_utc: Option<i32>,
    #[serde(default)]
    pub notify: Option<String>,
    #[serde(default)]
    pub email_subject: Option<String>,
    #[serde(default)]
    pub email_body: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub been_notified: Option<bool>,
}

impl DeviceUpdate {
    /// The only update the monitor cycle issues.
    pub fn been_notified(id: i32, been_notified: bool) -> Self {
        Self {
            id,
            been_notified: Some(been_notified),
            ..Default::default()
        }
    }

    /// Overlays the present fields onto `device`, e.g. to validate the result
    /// before writing it.
    pub fn apply_to(&self, device: &mut monitor_device::Model) {
        if let Some(name) = &self.name {
            device.name = name.clone();
        }
        if let Some(identifier) = &self.identifier {
            device.identifier = identifier.clone();
        }
        if let Some(port) = self.port {
            device.port = Some(port);
        }
        if let Some(protocol) = self.protocol {
            device.protocol = protocol;
        }
        if let Some(persist) = self.persist {
            device.persist = persist;
        }
        if let Some(trigger) = self.monitor_trigger {
            device.monitor_trigger = trigger;
        }
        if let Some(start) = self.monitor_start_utc {
            device.monitor_start_utc = start;
        }
        if let Some(end) = self.monitor_end_utc {
            device.monitor_end_utc = end;
        }
        if let Some(notify) = &self.notify {
            device.notify = notify.clone();
        }
        if let Some(subject) = &self.email_subject {
            device.email_subject = subject.clone();
        }
        if let Some(body) = &self.email_body {
            device.email_body = body.clone();
        }
        if let Some(comments) = &self.comments {
            device.comments = Some(comments.clone());
        }
        if let Some(been_notified) = self.been_notified {
            device.been_notified = been_notified;
        }
    }

    pub fn into_active_model(self, now: DateTime<Utc>) -> monitor_device::ActiveModel {
        fn set_if<T: Into<sea_orm::Value>>(value: Option<T>) -> sea_orm::ActiveValue<T> {
            match value {
                Some(v) => Set(v),
                None => NotSet,
            }
        }

        monitor_device::ActiveModel {
            id: Unchanged(self.id),
            name: set_if(self.name),
            identifier: set_if(self.identifier),
            port: match self.port {
                Some(port) => Set(Some(port)),
                None => NotSet,
            },
            protocol: set_if(self.protocol),
            persist: set_if(self.persist),
            monitor_trigger: set_if(self.monitor_trigger),
            monitor_start_utc: set_if(self.monitor_start_utc),
            monitor_end_utc: set_if(self.monitor_end_utc),
            been_notified: set_if(self.been_notified),
            requested_by: NotSet,
            notify: set_if(self.notify),
            email_subject: set_if(self.email_subject),
            email_body: set_if(self.email_body),
            comments: match self.comments {
                Some(comments) => Set(Some(comments)),
                None => NotSet,
            },
            created_at: NotSet,
            updated_at: Set(now),
        }
    }
}

pub fn validate_device(device: &monitor_device::Model) -> Result<(), ValidationError> {
    validate_fields(DeviceFields {
        name: &device.name,
        identifier: &device.identifier,
        notify: &device.notify,
        protocol: device.protocol,
        port: device.port,
        monitor_start_utc: device.monitor_start_utc,
        monitor_end_utc: device.monitor_end_utc,
    })
}

struct DeviceFields<'a> {
    name: &'a str,
    identifier: &'a str,
    notify: &'a str,
    protocol: Proto,
    port: Option<i32>,
    monitor_start_utc: i32,
    monitor_end_utc: i32,
}

fn validate_fields(fields: DeviceFields<'_>) -> Result<(), ValidationError> {
    if fields.name.trim().is_empty() {
        return Err(ValidationError::Empty("name"));
    }
    if fields.identifier.trim().is_empty() {
        return Err(ValidationError::Empty("identifier"));
    }
    if fields.notify.trim().is_empty() {
        return Err(ValidationError::Empty("notify"));
    }
    for (field, value) in [
        ("monitor_start_utc", fields.monitor_start_utc),
        ("monitor_end_utc", fields.monitor_end_utc),
    ] {
        if !(0..=WINDOW_MAX).contains(&value) {
            return Err(ValidationError::WindowOutOfRange { field, value });
        }
    }
    match (fields.protocol, fields.port) {
        (Proto::Tcp, None) => return Err(ValidationError::MissingPort),
        (_, Some(port)) if !(1..=i32::from(u16::MAX)).contains(&port) => {
            return Err(ValidationError::PortOutOfRange(port));
        }
        _ => {}
    }
    Ok(())
}
