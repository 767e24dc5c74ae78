//! Notification dispatch.
//!
//! One message per new record through a [`Notifier`]. Dispatch is bounded
//! and joined; a failed message is collected and never stops the others.

use crate::config::AppConfig;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reelwatch_core::diff::DiffEntry;
use reelwatch_core::errors::{ExError, ExErrorKind, Result};
use reelwatch_core::model::Record;
use reelwatch_core::notify::{format_notification, NotificationMessage};
use reelwatch_core_types::Sensitive;
use serde_json::{json, Value};
use std::time::Duration;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message announcing `record`.
    ///
    /// # Errors
    ///
    /// `Notify` if the channel rejects or cannot receive the message.
    async fn notify(&self, record: &Record) -> Result<()>;
}

/// Outcome of [`dispatch_all`].
#[derive(Debug, Default)]
pub struct NotifyReport {
    pub sent: usize,
    /// One `Notify` error per undelivered record, ordered by identity key
    pub failures: Vec<ExError>,
}

/// Notify every entry with at most `concurrency` messages in flight.
///
/// Each message is bounded by `timeout`. All messages are attempted.
pub async fn dispatch_all(
    notifier: &dyn Notifier,
    entries: &[DiffEntry],
    concurrency: usize,
    timeout: Duration,
) -> NotifyReport {
    let results: Vec<std::result::Result<(), ExError>> = stream::iter(entries)
        .map(|entry| async move {
            let key = entry.key.as_str();
            match tokio::time::timeout(timeout, notifier.notify(&entry.record)).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(notify_failure(key, e)),
                Err(_) => Err(notify_failure(
                    key,
                    ExError::new(ExErrorKind::Timeout)
                        .with_op("notify")
                        .with_message(format!("no response within {}ms", timeout.as_millis())),
                )),
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut report = NotifyReport::default();
    for result in results {
        match result {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!(
                    identity_key = e.identity_key().unwrap_or_default(),
                    error = %e,
                    "notification failed"
                );
                report.failures.push(e);
            }
        }
    }
    report
        .failures
        .sort_by(|a, b| a.identity_key().cmp(&b.identity_key()));
    report
}

fn notify_failure(key: &str, cause: ExError) -> ExError {
    let message = cause.message().to_string();
    ExError::new(ExErrorKind::Notify)
        .with_op("notify")
        .with_identity_key(key)
        .with_message(message)
        .with_source(cause)
}

/// Bot API method and JSON payload for a message.
///
/// Messages with an image go out as `sendPhoto` with a caption, the rest as
/// `sendMessage`.
pub fn telegram_request(chat_id: &str, message: &NotificationMessage) -> (&'static str, Value) {
    match &message.image_url {
        Some(photo) => (
            "sendPhoto",
            json!({
                "chat_id": chat_id,
                "photo": photo,
                "caption": message.caption(),
            }),
        ),
        None => (
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": message.text,
            }),
        ),
    }
}

/// Telegram Bot API channel.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    token: Sensitive<String>,
    chat_id: String,
}

impl TelegramNotifier {
    /// # Errors
    ///
    /// `Internal` if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        token: Sensitive<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ExError::new(ExErrorKind::Internal)
                    .with_op("build_notifier")
                    .with_message(e.to_string())
            })?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            chat_id: chat_id.into(),
        })
    }

    /// # Errors
    ///
    /// As [`TelegramNotifier::new`].
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            config.telegram_api_base.clone(),
            config.telegram_token.clone(),
            config.telegram_chat_id.clone(),
            config.http_timeout(),
        )
    }

    /// Contains the bot token; never log it.
    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token.expose(), method)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, record: &Record) -> Result<()> {
        let message = format_notification(record);
        let (method, payload) = telegram_request(&self.chat_id, &message);

        let response = self
            .client
            .post(self.method_url(method))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    ExErrorKind::Timeout
                } else {
                    ExErrorKind::Notify
                };
                // The request URL embeds the bot token
                ExError::new(kind)
                    .with_op(method)
                    .with_message(e.without_url().to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let description = response
            .json::<Value>()
            .await
            .ok()
            .and_then(|body| body.get("description").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default();
        Err(ExError::new(ExErrorKind::Notify)
            .with_op(method)
            .with_message(format!("HTTP {} {}", status, description).trim_end().to_string()))
    }
}
