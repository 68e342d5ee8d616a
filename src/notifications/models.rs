use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where notifications are delivered. Selected once at startup from the
/// `notifier` configuration key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChannelConfig {
    /// Writes each notification to the application log.
    #[default]
    Log,
    Telegram {
        bot_token: String,
        chat_id: String,
    },
    Webhook {
        url: String,
        method: String, // "GET" or "POST"
        headers: Option<HashMap<String, String>>,
        body_template: Option<String>,
    },
}

impl ChannelConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelConfig::Log => "log",
            ChannelConfig::Telegram { .. } => "telegram",
            ChannelConfig::Webhook { .. } => "webhook",
        }
    }
}

/// A notification rendered for one device, ready to hand to a sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationMessage {
    pub device_id: i32,
    /// The device's `notify` destination.
    pub recipient: String,
    pub subject: String,
    pub body: String,
    /// Template variables the message was rendered with.
    pub context: HashMap<String, String>,
}
