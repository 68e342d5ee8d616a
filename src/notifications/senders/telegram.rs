use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{ChannelConfig, NotificationMessage};

/// A sender for pushing notifications via the Telegram Bot API.
pub struct TelegramSender {
    client: Client,
}

impl Default for TelegramSender {
    fn default() -> Self {
        Self::new()
    }
}

impl TelegramSender {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Escapes text for Telegram MarkdownV2.
    /// Characters to escape: _ * [ ] ( ) ~ ` > # + - = | { } . !
    fn escape_markdown_v2(text: &str) -> String {
        let mut escaped_text = String::with_capacity(text.len());
        for c in text.chars() {
            if matches!(
                c,
                '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '='
                    | '|' | '{' | '}' | '.' | '!' | '\\'
            ) {
                escaped_text.push('\\');
            }
            escaped_text.push(c);
        }
        escaped_text
    }

    /// Bold subject, then the body, then who the alert was meant for.
    fn format_text(message: &NotificationMessage) -> String {
        format!(
            "*{}*\n\n{}\n\n_{}_",
            Self::escape_markdown_v2(&message.subject),
            Self::escape_markdown_v2(&message.body),
            Self::escape_markdown_v2(&format!("for {}", message.recipient)),
        )
    }
}

#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[async_trait]
impl NotificationSender for TelegramSender {
    async fn send(
        &self,
        config: &ChannelConfig,
        message: &NotificationMessage,
    ) -> Result<(), SenderError> {
        let ChannelConfig::Telegram { bot_token, chat_id } = config else {
            return Err(SenderError::InvalidConfiguration(
                "Expected Telegram config, but found a different type.".to_string(),
            ));
        };

        let api_url = format!("https://api.telegram.org/bot{bot_token}/sendMessage");
        let text = Self::format_text(message);
        let payload = TelegramMessage {
            chat_id,
            text: &text,
            parse_mode: "MarkdownV2",
        };

        let response = self.client.post(&api_url).json(&payload).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
