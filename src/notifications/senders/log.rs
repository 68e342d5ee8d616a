use async_trait::async_trait;
use tracing::info;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{ChannelConfig, NotificationMessage};

/// Writes notifications to the log instead of delivering them anywhere.
#[derive(Debug, Default)]
pub struct LogSender;

#[async_trait]
impl NotificationSender for LogSender {
    async fn send(
        &self,
        _config: &ChannelConfig,
        message: &NotificationMessage,
    ) -> Result<(), SenderError> {
        info!(
            device_id = message.device_id,
            recipient = %message.recipient,
            subject = %message.subject,
            body = %message.body,
            "Device notification."
        );
        Ok(())
    }
}
