//! Notifier adapters.
//!
//! With a bot token configured, messages go to the user's Telegram chat via
//! the Bot API `sendMessage` method. Without one they are only logged.

use std::time::Duration;

use bothost_core::notify::Notifier;
use bothost_types::error::NotifyError;
use bothost_types::identity::UserId;
use serde::Serialize;

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Delivers notifications through the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("base_url", &self.base_url)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

impl TelegramNotifier {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(token, TELEGRAM_API)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.base_url, self.token)
    }
}

impl Notifier for TelegramNotifier {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&SendMessage {
                chat_id: user.0,
                text,
            })
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Delivery(format!("telegram returned {status}: {body}")));
        }
        Ok(())
    }
}

/// Writes notifications to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError> {
        tracing::info!(user = %user, text, "notification");
        Ok(())
    }
}

/// The notifier selected by configuration.
#[derive(Debug, Clone)]
pub enum HostNotifier {
    Telegram(TelegramNotifier),
    Log(LogNotifier),
}

impl HostNotifier {
    /// Telegram when a token is configured, logging otherwise.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => HostNotifier::Telegram(TelegramNotifier::new(token)),
            None => HostNotifier::Log(LogNotifier),
        }
    }
}

impl Notifier for HostNotifier {
    async fn notify(&self, user: UserId, text: &str) -> Result<(), NotifyError> {
        match self {
            HostNotifier::Telegram(n) => n.notify(user, text).await,
            HostNotifier::Log(n) => n.notify(user, text).await,
        }
    }
}
