use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::{MonitorTrigger, Proto};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monitor_devices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    /// Hostname or literal IP address.
    pub identifier: String,
    /// Required when `protocol` is TCP.
    pub port: Option<i32>,
    pub protocol: Proto,
    /// `false` for one-shot monitors, which are removed once they notify.
    pub persist: bool,
    pub monitor_trigger: MonitorTrigger,
    /// Daily UTC window, HHMM as an integer in `0..=2400`, inclusive on both ends.
    pub monitor_start_utc: i32,
    pub monitor_end_utc: i32,
    /// Only meaningful for persistent monitors.
    pub been_notified: bool,
    pub requested_by: String,
    /// Destination address for notifications.
    pub notify: String,
    pub email_subject: String,
    #[sea_orm(column_type = "Text")]
    pub email_body: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub comments: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
