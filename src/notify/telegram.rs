//! Telegram notification sink
//!
//! Sends each message through the Bot API `sendMessage` endpoint, prefixed
//! with a severity icon. A 429 response is retried once, honoring the
//! `retry_after` hint. Any other failure is logged and dropped.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::Notifier;
use crate::config::NotifyConfig;
use crate::domain::{Result, SyncError};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

const ICON_INFO: &str = "\u{2139}\u{FE0F}";
const ICON_WARNING: &str = "\u{26A0}\u{FE0F}";
const ICON_ERROR: &str = "\u{274C}";
const ICON_SUCCESS: &str = "\u{2705}";

pub struct TelegramNotifier {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SendMessageError {
    #[serde(default)]
    description: String,
    #[serde(default)]
    parameters: RetryParameters,
}

#[derive(Debug, Default, Deserialize)]
struct RetryParameters {
    #[serde(default)]
    retry_after: u64,
}

impl TelegramNotifier {
    /// Builds a notifier from validated notification config.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when credentials are absent or the
    /// HTTP client cannot be constructed.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let token = config
            .telegram_token
            .clone()
            .ok_or_else(|| SyncError::Configuration("TELEGRAM_TOKEN is required".to_string()))?;
        let chat_id = config
            .telegram_chat_id
            .clone()
            .ok_or_else(|| SyncError::Configuration("TELEGRAM_CHAT_ID is required".to_string()))?;
        Self::new(token, chat_id)
    }

    pub fn new(token: SecretString, chat_id: String) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(TELEGRAM_TIMEOUT)
            .build()
            .map_err(|err| {
                SyncError::Configuration(format!("failed to build telegram client: {err}"))
            })?;
        Ok(Self {
            http,
            base_url: TELEGRAM_API_BASE.to_string(),
            token,
            chat_id,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.token.expose_secret()
        )
    }

    async fn send(&self, text: &str) {
        let endpoint = self.endpoint();
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
        };

        for attempt in 0..2 {
            let response = match self.http.post(&endpoint).json(&body).send().await {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!(error = %err, "telegram send failed");
                    return;
                }
            };

            let status = response.status();
            if status.is_success() {
                return;
            }

            let raw = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt == 0 {
                let parsed: SendMessageError = serde_json::from_str(&raw).unwrap_or_default();
                tokio::time::sleep(Duration::from_secs(parsed.parameters.retry_after)).await;
                continue;
            }

            let detail: SendMessageError = serde_json::from_str(&raw).unwrap_or_default();
            tracing::warn!(
                status = %status,
                description = %detail.description,
                "telegram send failed"
            );
            return;
        }

        tracing::warn!("telegram send failed: too many requests");
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn info(&self, message: &str) {
        self.send(&format_message(ICON_INFO, "INFO", message)).await;
    }

    async fn warning(&self, message: &str) {
        self.send(&format_message(ICON_WARNING, "WARNING", message))
            .await;
    }

    async fn error(&self, message: &str) {
        self.send(&format_message(ICON_ERROR, "ERROR", message))
            .await;
    }

    async fn success(&self, message: &str) {
        self.send(&format_message(ICON_SUCCESS, "SUCCESS", message))
            .await;
    }
}

fn format_message(icon: &str, level: &str, value: &str) -> String {
    let trimmed = value.trim();
    let text = if trimmed.is_empty() { "-" } else { trimmed };
    format!("{icon} {level}: {text}")
}
