//! Global configuration for the monokit agent.
//!
//! Every probe run is a fresh process, so the configuration is read once at
//! start from `global.yml` and treated as read-only afterwards. The file uses
//! kebab-case keys:
//!
//! ```yaml
//! project-identifier: infra
//! hostname: web-01
//! log-location: /var/log/monokit2/monokit.log
//! sqlite-location: /var/lib/monokit2/monokit.db
//! zulip-alarm:
//!   enabled: true
//!   interval: 5
//!   limit: 3
//!   webhook-urls:
//!     - https://chat.example.com/api/v1/external/slack_incoming?api_key=abc
//! redmine:
//!   enabled: true
//!   url: https://redmine.example.com
//!   api-key: secret
//!   interval: 5
//!   limit: 3
//! ```
//!
//! Test mode is not part of the file: it is derived from the `TEST`
//! environment variable, see [`is_test_mode`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default location of the global configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mono/global.yml";

/// Environment variable that switches the agent into test mode.
pub const TEST_MODE_VAR: &str = "TEST";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Read {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid YAML or does not match the expected shape.
    #[error("invalid YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// The configuration parsed but a value is unusable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the configuration.
        reason: String,
    },
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Chat-bot API settings. Parsed so the transport can be selected; the bot
/// transport itself is a stub.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotApiConfig {
    /// Use the bot API instead of webhooks.
    pub enabled: bool,
    /// Endpoint messages are posted to.
    pub alarm_url: String,
    /// Bot account e-mail.
    pub email: String,
    /// Bot API key.
    pub api_key: String,
    /// Users that receive direct messages.
    pub user_emails: Vec<String>,
}

/// Chat notification channel settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct AlarmConfig {
    /// Whether chat notifications are sent at all.
    pub enabled: bool,
    /// Minimum minutes between two notifications for the same tuple.
    pub interval: u64,
    /// How many consecutive same-status notifications are allowed.
    pub limit: usize,
    /// Webhook endpoints, posted to in order.
    pub webhook_urls: Vec<String>,
    /// Bot API transport.
    pub bot_api: BotApiConfig,
}

/// Redmine ticket backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct RedmineConfig {
    /// Whether tickets are managed at all.
    pub enabled: bool,
    /// Value of the `X-Redmine-API-Key` header.
    pub api_key: String,
    /// Base URL, without a trailing slash.
    pub url: String,
    /// Minimum minutes between two ticket actions for the same tuple.
    pub interval: u64,
    /// How many consecutive same-status ticket rows are allowed.
    pub limit: usize,
}

impl RedmineConfig {
    /// Returns true if both the URL and the API key are set.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// Returns the base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalConfig {
    /// Project this host belongs to; first component of every tuple.
    pub project_identifier: String,
    /// Host name; detected from the machine when empty.
    #[serde(default)]
    pub hostname: String,
    /// `stdout` or a file path for log output.
    #[serde(default = "default_log_location")]
    pub log_location: String,
    /// Path of the SQLite database holding alarm and issue history.
    pub sqlite_location: String,
    /// Chat notification settings.
    #[serde(default, rename = "zulip-alarm", alias = "alarm")]
    pub alarm: AlarmConfig,
    /// Ticket backend settings.
    #[serde(default)]
    pub redmine: RedmineConfig,
}

fn default_log_location() -> String {
    "stdout".to_string()
}

impl GlobalConfig {
    /// Loads the configuration from a YAML file and fills in the hostname
    /// when the file leaves it empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config = Self::from_yaml(&content)?.with_detected_hostname()?;
        debug!(path = %path.display(), project = %config.project_identifier, "loaded configuration");
        Ok(config)
    }

    /// Parses and validates configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or fails validation.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Replaces an empty hostname with the machine's hostname.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the hostname is empty and cannot be detected.
    pub fn with_detected_hostname(mut self) -> Result<Self> {
        if !self.hostname.trim().is_empty() {
            return Ok(self);
        }

        match hostname::get() {
            Ok(name) => {
                self.hostname = name.to_string_lossy().into_owned();
                debug!(hostname = %self.hostname, "hostname detected from system");
                Ok(self)
            }
            Err(e) => {
                warn!(error = %e, "could not detect hostname");
                Err(ConfigError::Invalid {
                    reason: format!("hostname is empty and could not be detected: {e}"),
                })
            }
        }
    }

    /// Validates the configuration.
    ///
    /// Missing Redmine credentials are not rejected here; they only matter
    /// once an escalation needs the backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.project_identifier.trim().is_empty() {
            return Err(invalid("project-identifier cannot be empty"));
        }

        if self.sqlite_location.trim().is_empty() {
            return Err(invalid("sqlite-location cannot be empty"));
        }

        for url in &self.alarm.webhook_urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(invalid(format!(
                    "webhook URL '{url}' must start with http:// or https://"
                )));
            }
        }

        if self.alarm.enabled && !self.alarm.bot_api.enabled && self.alarm.webhook_urls.is_empty()
        {
            return Err(invalid(
                "zulip-alarm is enabled but no webhook-urls are configured",
            ));
        }

        Ok(())
    }

    /// Returns true when logs should go to stdout rather than a file.
    #[must_use]
    pub fn logs_to_stdout(&self) -> bool {
        let location = self.log_location.trim();
        location.is_empty() || location == "stdout"
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.into(),
    }
}

/// Returns true if the agent runs in test mode, as decided by the `TEST`
/// environment variable.
#[must_use]
pub fn is_test_mode() -> bool {
    let value = std::env::var(TEST_MODE_VAR).ok();
    test_mode_from(value.as_deref())
}

/// Interprets a raw `TEST` value: `1`, `true` and `yes` enable test mode.
#[must_use]
pub fn test_mode_from(value: Option<&str>) -> bool {
    matches!(value, Some("1" | "true" | "yes"))
}
