//! Telegram Bot API alerter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use super::Alerter;
use crate::types::StakerError;

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramAlerter {
    http: Client,
    token: SecretString,
    chat_id: String,
    base_url: String,
}

impl TelegramAlerter {
    pub fn new(token: String, chat_id: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            token: SecretString::new(token),
            chat_id,
            base_url: TELEGRAM_API_BASE.to_string(),
        })
    }

    /// Point the client at another Bot API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn send_message_url(&self, message: &str) -> String {
        format!(
            "{}/bot{}/sendMessage?chat_id={}&text={}",
            self.base_url.trim_end_matches('/'),
            self.token.expose_secret(),
            urlencoding::encode(&self.chat_id),
            urlencoding::encode(message),
        )
    }
}

#[async_trait]
impl Alerter for TelegramAlerter {
    async fn send(&self, message: &str) -> Result<()> {
        let response = self
            .http
            .get(self.send_message_url(message))
            .send()
            .await
            .map_err(|e| StakerError::Alert(format!("Telegram request failed: {e}")))?;

        let status = response.status();
        let body: SendMessageResponse = response
            .json()
            .await
            .context("Failed to parse Telegram response")?;

        if !status.is_success() || !body.ok {
            return Err(StakerError::Alert(format!(
                "Telegram rejected message ({status}): {}",
                body.description.unwrap_or_default()
            ))
            .into());
        }

        debug!(chat_id = %self.chat_id, "Telegram alert sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}
