use async_trait::async_trait;
use reqwest::{Client, Method, header};
use serde_json::json;
use tera::{Context, Tera};

use super::{NotificationSender, SenderError};
use crate::notifications::models::{ChannelConfig, NotificationMessage};

/// Pushes notifications to an HTTP endpoint.
///
/// POST requests carry a JSON body: either `body_template` rendered with the
/// message context, or the message itself. GET requests pass the recipient
/// and subject as query parameters.
pub struct WebhookSender {
    client: Client,
}

impl Default for WebhookSender {
    fn default() -> Self {
        Self::new()
    }
}

impl WebhookSender {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn render_body(
        message: &NotificationMessage,
        body_template: Option<&str>,
    ) -> Result<String, SenderError> {
        let Some(template) = body_template else {
            let payload = json!({
                "device_id": message.device_id,
                "recipient": message.recipient,
                "subject": message.subject,
                "body": message.body,
                "context": message.context,
            });
            return Ok(payload.to_string());
        };

        let mut tera_context = Context::new();
        for (key, value) in &message.context {
            tera_context.insert(key, value);
        }
        tera_context.insert("recipient", &message.recipient);
        tera_context.insert("subject", &message.subject);
        tera_context.insert("body", &message.body);

        Tera::one_off(template, &tera_context, true)
            .map_err(|e| SenderError::TemplatingError(e.to_string()))
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    async fn send(
        &self,
        config: &ChannelConfig,
        message: &NotificationMessage,
    ) -> Result<(), SenderError> {
        let ChannelConfig::Webhook {
            url,
            method,
            headers,
            body_template,
        } = config
        else {
            return Err(SenderError::InvalidConfiguration(
                "Expected Webhook config, but found a different type.".to_string(),
            ));
        };

        let http_method = match method.to_uppercase().as_str() {
            "POST" => Method::POST,
            "GET" => Method::GET,
            _ => {
                return Err(SenderError::InvalidConfiguration(format!(
                    "Unsupported HTTP method: {method}"
                )));
            }
        };

        let mut request_builder = self.client.request(http_method.clone(), url);

        if let Some(h) = headers {
            let mut header_map = header::HeaderMap::new();
            for (key, value) in h {
                let header_name = header::HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
                    SenderError::InvalidConfiguration(format!("Invalid header name: {e}"))
                })?;
                let header_value = header::HeaderValue::from_str(value).map_err(|e| {
                    SenderError::InvalidConfiguration(format!("Invalid header value: {e}"))
                })?;
                header_map.insert(header_name, header_value);
            }
            request_builder = request_builder.headers(header_map);
        }

        if http_method == Method::POST {
            let rendered_body = Self::render_body(message, body_template.as_deref())?;
            request_builder = request_builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(rendered_body);
        } else {
            request_builder = request_builder.query(&[
                ("recipient", message.recipient.as_str()),
                ("subject", message.subject.as_str()),
            ]);
        }

        let response = request_builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SenderError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
