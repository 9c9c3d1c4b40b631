//! Operator alerts.
//!
//! Defines the `Alerter` trait used by the loss-streak guard and provides:
//! - `LogAlerter`: writes the alert to the log only
//! - `TelegramAlerter`: Bot API `sendMessage`

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{AlertsConfig, AppConfig};
use telegram::TelegramAlerter;

/// Sink for operator-facing alerts.
///
/// A failed send is reported to the caller but must never change a
/// decision already taken.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Alerter: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;

    /// Alerter name for logging.
    fn name(&self) -> &str;
}

/// Fallback alerter when no external channel is configured.
#[derive(Debug, Default)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn send(&self, message: &str) -> Result<()> {
        warn!(alert = message, "ALERT");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Pick the alerter from config.
///
/// Telegram is used when both env-var names are configured and set;
/// anything missing falls back to [`LogAlerter`] with a warning.
pub fn build_alerter(config: &AlertsConfig) -> Arc<dyn Alerter> {
    let (Some(token_env), Some(chat_env)) = (
        config.telegram_bot_token_env.as_deref(),
        config.telegram_chat_id_env.as_deref(),
    ) else {
        info!("No Telegram alerting configured, alerts go to the log");
        return Arc::new(LogAlerter);
    };

    let resolved = AppConfig::resolve_env(token_env)
        .and_then(|token| Ok((token, AppConfig::resolve_env(chat_env)?)))
        .and_then(|(token, chat_id)| TelegramAlerter::new(token, chat_id));

    match resolved {
        Ok(alerter) => {
            info!("Telegram alerting enabled");
            Arc::new(alerter)
        }
        Err(e) => {
            warn!(error = %e, "Telegram alerting unavailable, falling back to log");
            Arc::new(LogAlerter)
        }
    }
}
