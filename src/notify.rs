//! # notify — deliver signal texts
//!
//! Best effort: a failed send aborts the run, but nothing is tracked about
//! what was already delivered.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{Config, TelegramConfig};
use crate::error::BotError;

// ─── Port ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), BotError>;
}

/// Telegram when both `BOT_TOKEN` and `CHAT_ID` are set, log-only otherwise.
pub fn from_config(client: &reqwest::Client, config: &Config) -> Arc<dyn Notifier> {
    match &config.telegram {
        Some(telegram) => Arc::new(TelegramNotifier::new(client.clone(), telegram.clone())),
        None => {
            warn!("BOT_TOKEN / CHAT_ID not set — signals will only be logged");
            Arc::new(LogNotifier)
        }
    }
}

// ─── Telegram ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text:    &'a str,
}

#[derive(Deserialize, Default)]
struct TelegramResponse {
    #[serde(default)]
    ok:          bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    client:  reqwest::Client,
    config:  TelegramConfig,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, config: TelegramConfig) -> Self {
        Self {
            client,
            config,
            timeout: Duration::from_secs(10),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_url.trim_end_matches('/'),
            self.config.bot_token
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), BotError> {
        let body = SendMessage {
            chat_id: &self.config.chat_id,
            text,
        };

        // without_url(): the request URL embeds the bot token
        let resp = self
            .client
            .post(self.url())
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BotError::notifier(format!("Telegram unreachable: {}", e.without_url())))?;

        let status = resp.status();
        let reply: TelegramResponse = resp.json().await.unwrap_or_default();
        check_reply(status, reply)?;

        info!(text, "📨 Signal delivered");
        Ok(())
    }
}

/// Delivered only on a 2xx status with `"ok": true`. An unreadable body
/// counts as `ok: false`.
fn check_reply(status: reqwest::StatusCode, reply: TelegramResponse) -> Result<(), BotError> {
    if status.is_success() && reply.ok {
        return Ok(());
    }
    Err(BotError::notifier(format!(
        "Telegram rejected message: HTTP {status}: {}",
        reply.description.unwrap_or_default()
    )))
}

// ─── Log only ─────────────────────────────────────────────────────────────────

/// Writes signals to the log instead of delivering them. Never fails.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<(), BotError> {
        info!(text, "📝 Signal (log only)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_telegram() -> TelegramConfig {
        TelegramConfig {
            api_url:   "https://api.telegram.org/".to_string(),
            bot_token: "123:abc".to_string(),
            chat_id:   "-10042".to_string(),
        }
    }

    #[test]
    fn test_send_message_url() {
        let notifier = TelegramNotifier::new(reqwest::Client::new(), make_telegram());
        assert_eq!(notifier.url(), "https://api.telegram.org/bot123:abc/sendMessage");
    }

    #[test]
    fn test_send_message_body() {
        let body = serde_json::to_value(SendMessage { chat_id: "-10042", text: "✅ TP1 HIT @ 100.5000" }).unwrap();
        assert_eq!(body, serde_json::json!({ "chat_id": "-10042", "text": "✅ TP1 HIT @ 100.5000" }));
    }

    #[test]
    fn test_reply_needs_success_status_and_ok() {
        use reqwest::StatusCode;

        let ok = || TelegramResponse { ok: true, description: None };
        assert!(check_reply(StatusCode::OK, ok()).is_ok());

        let err = check_reply(StatusCode::BAD_REQUEST, ok()).unwrap_err();
        assert!(err.to_string().contains("400"));

        let refused = TelegramResponse {
            ok:          false,
            description: Some("Bad Request: chat not found".to_string()),
        };
        let err = check_reply(StatusCode::OK, refused).unwrap_err();
        assert!(err.to_string().contains("chat not found"));

        // Unparseable 2xx body
        assert!(check_reply(StatusCode::OK, TelegramResponse::default()).is_err());
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.send("🚀 LONG ENTRY @ 100.0000").await.is_ok());
    }
}
