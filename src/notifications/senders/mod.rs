use async_trait::async_trait;
use thiserror::Error;

use super::models::{ChannelConfig, NotificationMessage};

pub mod log;
pub mod telegram;
pub mod webhook;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(String),
}

impl SenderError {
    /// The channel itself could not be reached, as opposed to one message
    /// being rejected.
    pub fn is_transport(&self) -> bool {
        matches!(self, SenderError::NetworkError(_))
    }
}

/// Delivers one rendered message over a specific channel type.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        config: &ChannelConfig,
        message: &NotificationMessage,
    ) -> Result<(), SenderError>;
}
