use crate::error::AlerterError;
use async_trait::async_trait;
use configuration::AlertsConfig;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;

/// Somewhere a text alert can be delivered.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), AlerterError>;
}

/// The JSON payload for the Telegram `sendMessage` endpoint.
///
/// Messages are sent as plain text, so amounts like `+12.5 $` need no escaping.
#[derive(Debug, Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// A client for sending messages to the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Returns `None` if the token or chat_id is missing from the configuration,
    /// allowing the system to gracefully disable alerting.
    pub fn new(config: &AlertsConfig) -> Option<Self> {
        if config.token.is_empty() || config.chat_id.is_empty() {
            tracing::warn!("Telegram alerter is not configured (missing token or chat_id).");
            return None;
        }
        Some(Self {
            client: Client::new(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl NotificationSink for TelegramAlerter {
    async fn send(&self, message: &str) -> Result<(), AlerterError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);

        let payload = SendMessagePayload {
            chat_id: &self.chat_id,
            text: message,
        };

        let response = self.client.post(&url).json(&payload).send().await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError(error_text));
        }

        Ok(())
    }
}

/// Writes alerts to the log instead of a chat. Used when Telegram is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, message: &str) -> Result<(), AlerterError> {
        tracing::info!(target: "alerts", "{}", message);
        Ok(())
    }
}

/// Picks the Telegram sink when alerts are enabled and configured, otherwise the log sink.
pub fn sink_from_config(config: &AlertsConfig) -> Arc<dyn NotificationSink> {
    if config.enabled {
        if let Some(telegram) = TelegramAlerter::new(config) {
            tracing::info!("Telegram alerts enabled.");
            return Arc::new(telegram);
        }
    }
    Arc::new(LogSink)
}
