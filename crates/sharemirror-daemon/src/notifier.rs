//! Notification adapters
//!
//! - [`LogNotifier`] writes summaries to the tracing log
//! - [`WebhookNotifier`] posts them to a chat webhook as
//!   `{"msgtype":"text","text":{"content":...}}`
//!
//! A robot configured with a signing secret expects `timestamp` (epoch
//! milliseconds) and `sign` query parameters. `sign` is the base64
//! HMAC-SHA256 of `"{timestamp}\n{secret}"` keyed by the secret.
//!
//! The scheduler logs delivery failures and carries on, so both adapters
//! simply report errors.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::Sha256;
use tracing::{debug, info, warn};

use sharemirror_core::config::NotificationsConfig;
use sharemirror_core::ports::{INotificationService, Notification, NotificationPriority};

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

type HmacSha256 = Hmac<Sha256>;

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl INotificationService for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.priority {
            NotificationPriority::High => warn!(
                category = %notification.category,
                "{}",
                notification.as_text()
            ),
            _ => info!(
                category = %notification.category,
                "{}",
                notification.as_text()
            ),
        }
        Ok(())
    }
}

/// Posts notifications to a chat webhook
pub struct WebhookNotifier {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .context("Failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
            secret: None,
        })
    }

    /// Signs every request with the robot's secret
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }
}

/// Base64 HMAC-SHA256 of `"{timestamp_ms}\n{secret}"` keyed by `secret`
fn webhook_sign(secret: &str, timestamp_ms: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .context("Invalid webhook signing secret")?;
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    Ok(base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn webhook_payload(notification: &Notification) -> serde_json::Value {
    serde_json::json!({
        "msgtype": "text",
        "text": { "content": notification.as_text() },
    })
}

#[async_trait::async_trait]
impl INotificationService for WebhookNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let mut request = self.client.post(&self.url);
        if let Some(secret) = &self.secret {
            let timestamp = Utc::now().timestamp_millis();
            let sign = webhook_sign(secret, timestamp)?;
            debug!(timestamp, "Signing webhook request");
            request = request.query(&[("timestamp", timestamp.to_string()), ("sign", sign)]);
        }
        let response = request
            .json(&webhook_payload(notification))
            .send()
            .await
            .context("Webhook request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Webhook returned HTTP {}: {}", status.as_u16(), body);
        }
        Ok(())
    }
}

/// Picks the webhook adapter when enabled and configured, the log otherwise
pub fn from_config(config: &NotificationsConfig) -> Result<Arc<dyn INotificationService>> {
    match (&config.webhook_url, config.enabled) {
        (Some(url), true) => {
            info!(url = %url, signed = config.secret.is_some(), "Sending notifications to webhook");
            let mut notifier = WebhookNotifier::new(url.as_str())?;
            if let Some(secret) = &config.secret {
                notifier = notifier.with_secret(secret.as_str());
            }
            Ok(Arc::new(notifier))
        }
        _ => Ok(Arc::new(LogNotifier)),
    }
}
