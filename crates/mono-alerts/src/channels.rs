//! Notification channels for alarm delivery.
//!
//! This module provides the [`NotificationChannel`] trait, the webhook
//! transport used in production and the bot-API transport selected by
//! `zulip-alarm.bot-api.enabled`.

use std::fmt;
use std::time::Duration;

use mono_config::AlarmConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::{AlertError, Result};
use crate::types::TupleKey;
use crate::{HTTP_TIMEOUT_SECS, USER_AGENT};

/// A chat message to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Message text.
    pub text: String,
    /// Tuple the message is about.
    pub key: TupleKey,
    /// Logical status being reported.
    pub status: String,
}

impl Notification {
    /// Creates a notification.
    #[must_use]
    pub fn new(text: impl Into<String>, key: &TupleKey, status: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            key: key.clone(),
            status: status.into(),
        }
    }
}

/// Result of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The channel that delivered the message.
    pub channel: String,
    /// Number of endpoints that accepted the message.
    pub endpoints: usize,
}

/// Trait for notification channels.
///
/// A send either reaches every endpoint or fails as a whole; there is no
/// partial-success bookkeeping.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel.
    fn name(&self) -> &str;

    /// Sends a notification through this channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SendFailed` on a transport error or non-2xx status.
    fn send(&self, notification: &Notification) -> Result<Delivery>;

    /// Returns true if this channel is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Body posted to each webhook URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Message text.
    pub text: String,
}

/// Posts `{"text": ...}` to a list of webhook URLs in order.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    urls: Vec<String>,
    enabled: bool,
    client: reqwest::blocking::Client,
}

impl WebhookChannel {
    /// Creates a webhook channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if no URL is given or the HTTP
    /// client cannot be built.
    pub fn new(urls: Vec<String>) -> Result<Self> {
        if urls.is_empty() {
            return Err(AlertError::InvalidConfig {
                reason: "webhook channel needs at least one URL".to_string(),
            });
        }
        Self::build(urls, true)
    }

    /// Creates a channel with no URLs that never sends.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the HTTP client cannot be built.
    pub fn disabled() -> Result<Self> {
        Self::build(Vec::new(), false)
    }

    fn build(urls: Vec<String>, enabled: bool) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AlertError::InvalidConfig {
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            urls,
            enabled,
            client,
        })
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the configured URLs.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    fn failed(reason: String) -> AlertError {
        AlertError::SendFailed {
            channel: "webhook".to_string(),
            reason,
        }
    }
}

impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send(&self, notification: &Notification) -> Result<Delivery> {
        let payload = WebhookPayload {
            text: notification.text.clone(),
        };

        // Webhook URLs often embed an API key, so only the index is logged.
        for (index, url) in self.urls.iter().enumerate() {
            let response = self
                .client
                .post(url)
                .json(&payload)
                .send()
                .map_err(|e| {
                    error!(endpoint = index, error = %e, "webhook request failed");
                    Self::failed(format!("endpoint {index}: {e}"))
                })?;

            let status = response.status();
            if !status.is_success() {
                error!(endpoint = index, status = status.as_u16(), "webhook rejected notification");
                return Err(Self::failed(format!(
                    "endpoint {index} returned HTTP {}",
                    status.as_u16()
                )));
            }
            debug!(endpoint = index, status = status.as_u16(), "webhook accepted notification");
        }

        Ok(Delivery {
            channel: self.name().to_string(),
            endpoints: self.urls.len(),
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Chat-bot API transport.
///
/// Only the configuration is wired up; sending logs the message and
/// reports success.
#[derive(Debug, Clone)]
pub struct BotApiChannel {
    alarm_url: String,
    recipients: Vec<String>,
}

impl BotApiChannel {
    /// Creates a bot-API channel.
    #[must_use]
    pub fn new(alarm_url: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            alarm_url: alarm_url.into(),
            recipients,
        }
    }

    /// Returns the users that receive direct messages.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }
}

impl NotificationChannel for BotApiChannel {
    fn name(&self) -> &str {
        "bot-api"
    }

    fn send(&self, notification: &Notification) -> Result<Delivery> {
        info!(
            alarm_url = %self.alarm_url,
            recipients = self.recipients.len(),
            key = %notification.key,
            status = %notification.status,
            "bot API delivery is not implemented, message dropped"
        );
        Ok(Delivery {
            channel: self.name().to_string(),
            endpoints: 0,
        })
    }
}

/// Builds the channel selected by the alarm configuration.
///
/// The bot API replaces the webhooks when it is enabled.
///
/// # Errors
///
/// Returns `AlertError::InvalidConfig` if the webhook channel cannot be built.
pub fn channel_from_config(config: &AlarmConfig) -> Result<Box<dyn NotificationChannel>> {
    if config.bot_api.enabled {
        return Ok(Box::new(BotApiChannel::new(
            &config.bot_api.alarm_url,
            config.bot_api.user_emails.clone(),
        )));
    }

    if !config.enabled && config.webhook_urls.is_empty() {
        return Ok(Box::new(WebhookChannel::disabled()?));
    }

    Ok(Box::new(
        WebhookChannel::new(config.webhook_urls.clone())?.enabled(config.enabled),
    ))
}
