//! Chat notification sinks

use std::time::Duration;

use async_trait::async_trait;
use sd_core::config::TelegramConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),
    #[error("Sink disabled")]
    Disabled,
    #[error("Rejected by chat API: {0}")]
    Rejected(String),
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for plain-text chat notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Whether `send` would attempt a delivery at all
    fn is_enabled(&self) -> bool;

    async fn send(&self, chat_id: &str, text: &str) -> SinkResult<()>;
}

/// Sink used when chat notifications are not configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledSink;

#[async_trait]
impl NotificationSink for DisabledSink {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn send(&self, _chat_id: &str, _text: &str) -> SinkResult<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API sink (`sendMessage`)
pub struct TelegramSink {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
}

impl TelegramSink {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        timeout: Duration,
    ) -> SinkResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::DeliveryFailed(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            bot_token: bot_token.into(),
        })
    }

    /// Build from configuration; `None` unless a token and a valid chat id are set
    pub fn from_config(config: &TelegramConfig) -> Option<SinkResult<Self>> {
        if !config.is_deliverable() {
            return None;
        }
        let token = config.bot_token.as_deref()?;
        Some(Self::new(
            config.api_base.clone(),
            token,
            Duration::from_secs(config.request_timeout_secs),
        ))
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn is_enabled(&self) -> bool {
        !self.bot_token.is_empty()
    }

    async fn send(&self, chat_id: &str, text: &str) -> SinkResult<()> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&SendMessageRequest { chat_id, text })
            .send()
            .await
            .map_err(|e| SinkError::DeliveryFailed(e.without_url().to_string()))?;

        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .map_err(|e| SinkError::DeliveryFailed(format!("HTTP {}: {}", status, e)))?;

        if !body.ok {
            return Err(SinkError::Rejected(
                body.description.unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }
        tracing::debug!(chat_id, "Chat notification delivered");
        Ok(())
    }
}

/// Keeps every message it is given
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(chat_id, text)` pairs in delivery order
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub async fn texts(&self) -> Vec<String> {
        self.sent.lock().await.iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, chat_id: &str, text: &str) -> SinkResult<()> {
        self.sent
            .lock()
            .await
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_valid_chat() {
        let mut config = TelegramConfig {
            bot_token: Some("123:abc".into()),
            chat_id: Some("not-a-chat".into()),
            ..Default::default()
        };
        assert!(TelegramSink::from_config(&config).is_none());

        config.chat_id = Some("-100200".into());
        let sink = TelegramSink::from_config(&config).unwrap().unwrap();
        assert!(sink.is_enabled());
        assert_eq!(
            sink.endpoint(),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn test_disabled_sink_is_a_noop() {
        let sink = DisabledSink;
        assert!(!sink.is_enabled());
        assert!(sink.send("1", "hello").await.is_ok());
    }

    #[tokio::test]
    async fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.send("42", "first").await.unwrap();
        sink.send("42", "second").await.unwrap();
        assert_eq!(sink.texts().await, vec!["first", "second"]);
    }
}
