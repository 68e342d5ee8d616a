use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probe mechanism used to test a device.
///
/// Connectionless protocols are deliberately not representable: a UDP probe
/// cannot tell "port closed" apart from "no reply sent".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "proto_enum")]
#[serde(rename_all = "UPPERCASE")]
pub enum Proto {
    #[default]
    #[sea_orm(string_value = "ICMP")]
    Icmp,
    #[sea_orm(string_value = "TCP")]
    Tcp,
}

impl fmt::Display for Proto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Proto::Icmp => f.write_str("ICMP"),
            Proto::Tcp => f.write_str("TCP"),
        }
    }
}

/// The reachability transition that fires a notification.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "monitor_trigger_enum")]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorTrigger {
    #[sea_orm(string_value = "ONLINE")]
    Online,
    #[default]
    #[sea_orm(string_value = "OFFLINE")]
    Offline,
}

impl fmt::Display for MonitorTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorTrigger::Online => f.write_str("ONLINE"),
            MonitorTrigger::Offline => f.write_str("OFFLINE"),
        }
    }
}
