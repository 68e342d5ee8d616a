use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{ChannelConfig, NotificationMessage};
use super::senders::log::LogSender;
use super::senders::telegram::TelegramSender;
use super::senders::webhook::WebhookSender;
use super::senders::{NotificationSender, SenderError};
use crate::db::entities::monitor_device;
use crate::db::enums::MonitorTrigger;
use crate::monitoring::ports::DeviceNotifier;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Notification channel unreachable: {0}")]
    Transport(#[source] SenderError),
    #[error("Notification channel misconfigured: {0}")]
    InvalidChannel(String),
}

/// Renders each device's subject and body and hands them to the sender for
/// the configured channel.
pub struct NotificationService {
    channel: ChannelConfig,
    sender: Arc<dyn NotificationSender>,
}

impl NotificationService {
    pub fn new(channel: ChannelConfig) -> Self {
        let sender: Arc<dyn NotificationSender> = match &channel {
            ChannelConfig::Log => Arc::new(LogSender),
            ChannelConfig::Telegram { .. } => Arc::new(TelegramSender::new()),
            ChannelConfig::Webhook { .. } => Arc::new(WebhookSender::new()),
        };
        Self::with_sender(channel, sender)
    }

    pub fn with_sender(channel: ChannelConfig, sender: Arc<dyn NotificationSender>) -> Self {
        Self { channel, sender }
    }
}

#[async_trait]
impl DeviceNotifier for NotificationService {
    async fn notify(&self, devices: &[monitor_device::Model]) -> Result<(), NotificationError> {
        let mut delivered = 0;
        for device in devices {
            let message = match render_message(device) {
                Ok(message) => message,
                Err(e) => {
                    warn!(
                        device_id = device.id,
                        error = %e,
                        "Skipping notification: template failed to render."
                    );
                    continue;
                }
            };

            match self.sender.send(&self.channel, &message).await {
                Ok(()) => {
                    debug!(
                        device_id = device.id,
                        recipient = %message.recipient,
                        "Notification sent."
                    );
                    delivered += 1;
                }
                Err(e) if e.is_transport() => return Err(NotificationError::Transport(e)),
                Err(SenderError::InvalidConfiguration(reason)) => {
                    return Err(NotificationError::InvalidChannel(reason));
                }
                Err(e) => {
                    warn!(
                        device_id = device.id,
                        recipient = %message.recipient,
                        error = %e,
                        "Notification was not delivered."
                    );
                }
            }
        }
        info!(
            channel = self.channel.kind(),
            delivered,
            total = devices.len(),
            "Notification batch processed."
        );
        Ok(())
    }
}

/// Whether this notification reports the end of a persistent alarm. Only
/// meaningful for devices that were classified as needing a notification.
pub fn alarm_cleared(device: &monitor_device::Model) -> bool {
    device.persist && device.been_notified
}

/// The state the device is being reported in.
pub fn reported_status(device: &monitor_device::Model) -> &'static str {
    let offline = match device.monitor_trigger {
        MonitorTrigger::Offline => !alarm_cleared(device),
        MonitorTrigger::Online => alarm_cleared(device),
    };
    if offline { "offline" } else { "online" }
}

/// Renders `email_subject` and `email_body` as Tera templates against the
/// device's fields.
pub fn render_message(device: &monitor_device::Model) -> Result<NotificationMessage, SenderError> {
    let cleared = alarm_cleared(device);
    let context: HashMap<String, String> = [
        ("id", device.id.to_string()),
        ("name", device.name.clone()),
        ("identifier", device.identifier.clone()),
        ("port", device.port.map(|p| p.to_string()).unwrap_or_default()),
        ("protocol", device.protocol.to_string()),
        ("persist", device.persist.to_string()),
        ("monitor_trigger", device.monitor_trigger.to_string()),
        ("monitor_start_utc", format!("{:04}", device.monitor_start_utc)),
        ("monitor_end_utc", format!("{:04}", device.monitor_end_utc)),
        ("requested_by", device.requested_by.clone()),
        ("notify", device.notify.clone()),
        ("comments", device.comments.clone().unwrap_or_default()),
        ("status", reported_status(device).to_string()),
        ("alarm_cleared", cleared.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();

    let mut tera_context = Context::new();
    for (key, value) in &context {
        tera_context.insert(key, value);
    }
    tera_context.insert("alarm_cleared", &cleared);
    tera_context.insert("persist", &device.persist);

    let render = |template: &str| {
        Tera::one_off(template, &tera_context, false)
            .map_err(|e| SenderError::TemplatingError(e.to_string()))
    };

    Ok(NotificationMessage {
        device_id: device.id,
        recipient: device.notify.clone(),
        subject: render(&device.email_subject)?,
        body: render(&device.email_body)?,
        context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::Proto;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<NotificationMessage>>,
        reject_recipient: Option<String>,
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(
            &self,
            _config: &ChannelConfig,
            message: &NotificationMessage,
        ) -> Result<(), SenderError> {
            if self.reject_recipient.as_deref() == Some(message.recipient.as_str()) {
                return Err(SenderError::SendFailed("mailbox unavailable".to_string()));
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    fn device(id: i32) -> monitor_device::Model {
        monitor_device::Model {
            id,
            name: "edge-fw".to_string(),
            identifier: "fw.example.net".to_string(),
            port: Some(443),
            protocol: Proto::Tcp,
            persist: false,
            monitor_trigger: MonitorTrigger::Offline,
            monitor_start_utc: 30,
            monitor_end_utc: 2400,
            been_notified: false,
            requested_by: "alice".to_string(),
            notify: format!("team{id}@example.com"),
            email_subject: "{{ name }} is {{ status }}".to_string(),
            email_body: concat!(
                "{{ identifier }}:{{ port }} from {{ monitor_start_utc }}",
                "{% if alarm_cleared %} (cleared){% endif %}",
            )
            .to_string(),
            comments: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_message_with_device_context() {
        let message = render_message(&device(1)).unwrap();
        assert_eq!(message.recipient, "team1@example.com");
        assert_eq!(message.subject, "edge-fw is offline");
        assert_eq!(message.body, "fw.example.net:443 from 0030");
        assert_eq!(message.context["protocol"], "TCP");
    }

    #[test]
    fn test_clearing_notification_reports_recovery() {
        let mut cleared = device(1);
        cleared.persist = true;
        cleared.been_notified = true;
        let message = render_message(&cleared).unwrap();
        assert_eq!(message.subject, "edge-fw is online");
        assert!(message.body.ends_with("(cleared)"));

        cleared.monitor_trigger = MonitorTrigger::Online;
        assert_eq!(reported_status(&cleared), "offline");
        cleared.been_notified = false;
        assert_eq!(reported_status(&cleared), "online");
    }

    #[tokio::test]
    async fn test_bad_template_and_rejected_recipient_are_skipped() {
        let mut broken = device(1);
        broken.email_subject = "{{ name".to_string();
        let sender = Arc::new(RecordingSender {
            reject_recipient: Some("team2@example.com".to_string()),
            ..Default::default()
        });
        let service = NotificationService::with_sender(ChannelConfig::Log, sender.clone());

        service
            .notify(&[broken, device(2), device(3)])
            .await
            .unwrap();

        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].device_id, 3);
    }

    #[tokio::test]
    async fn test_log_channel_accepts_everything() {
        let service = NotificationService::new(ChannelConfig::Log);
        assert!(service.notify(&[device(1), device(2)]).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_fails_the_batch() {
        let service = NotificationService::new(ChannelConfig::Webhook {
            url: "http://127.0.0.1:1/notify".to_string(),
            method: "POST".to_string(),
            headers: None,
            body_template: None,
        });
        let result = service.notify(&[device(1)]).await;
        assert!(matches!(result, Err(NotificationError::Transport(_))));
    }
}
