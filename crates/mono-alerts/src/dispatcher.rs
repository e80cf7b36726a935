//! Alarm dispatcher.
//!
//! Decides whether a probe's chat message goes out, sends it, and records
//! the send. A row is written only after a successful send, so a failed send
//! is retried from scratch by the next probe run.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mono_config::GlobalConfig;
use tracing::{debug, error, info};

use crate::channels::{Notification, NotificationChannel};
use crate::error::Result;
use crate::history::HistoryStore;
use crate::policy::{self, RateLimit, SuppressReason, Verdict};
use crate::types::{AlarmEvent, Identity};

/// Settings for [`AlarmDispatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Project and host stamped on every event.
    pub identity: Identity,
    /// Whether chat notifications are sent at all.
    pub enabled: bool,
    /// Throttling for the alarm channel.
    pub rate: RateLimit,
    /// Skip the network while keeping decisions and persistence.
    pub test_mode: bool,
}

impl DispatcherConfig {
    /// Creates a config for an enabled channel with no throttling.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            enabled: true,
            rate: RateLimit::unlimited(),
            test_mode: false,
        }
    }

    /// Builds the dispatcher settings from the global configuration.
    #[must_use]
    pub fn from_global(config: &GlobalConfig, test_mode: bool) -> Self {
        Self {
            identity: Identity::from(config),
            enabled: config.alarm.enabled,
            rate: RateLimit::new(config.alarm.interval, config.alarm.limit),
            test_mode,
        }
    }

    /// Sets the rate limit.
    #[must_use]
    pub const fn with_rate(mut self, rate: RateLimit) -> Self {
        self.rate = rate;
        self
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets test mode.
    #[must_use]
    pub const fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

/// Outcome of [`AlarmDispatcher::notify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The message went out and was recorded.
    Sent(AlarmEvent),
    /// Nothing was sent or recorded.
    Suppressed(SuppressReason),
}

impl NotifyOutcome {
    /// Returns a short label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Sent(_) => "sent",
            Self::Suppressed(_) => "suppressed",
        }
    }
}

/// Sends chat alarms once per meaningful transition.
pub struct AlarmDispatcher {
    config: DispatcherConfig,
    store: Arc<dyn HistoryStore>,
    channel: Box<dyn NotificationChannel>,
}

impl fmt::Debug for AlarmDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlarmDispatcher")
            .field("config", &self.config)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl AlarmDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(
        config: DispatcherConfig,
        store: Arc<dyn HistoryStore>,
        channel: Box<dyn NotificationChannel>,
    ) -> Self {
        Self {
            config,
            store,
            channel,
        }
    }

    /// Returns the dispatcher settings.
    #[must_use]
    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Notifies about `status` for the given probe and sub-check.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::SendFailed` if delivery fails (nothing is
    /// recorded) or `AlertError::QueryFailed` if history is unavailable.
    pub fn notify(
        &self,
        message: &str,
        service: &str,
        module: &str,
        status: &str,
    ) -> Result<NotifyOutcome> {
        self.notify_at(message, service, module, status, Utc::now())
    }

    /// Same as [`notify`](Self::notify) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`notify`](Self::notify).
    pub fn notify_at(
        &self,
        message: &str,
        service: &str,
        module: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<NotifyOutcome> {
        let key = self.config.identity.key(service, module);

        if !self.config.enabled || !self.channel.is_enabled() {
            debug!(key = %key, status, "alarm channel disabled");
            return Ok(NotifyOutcome::Suppressed(SuppressReason::BackendDisabled));
        }

        // The head of the window is the most recent alarm.
        let window = self.store.last_alarms(&key, self.config.rate.limit.max(1))?;
        let verdict = policy::check(
            window.first(),
            &window,
            status,
            self.config.rate,
            now,
            self.config.test_mode,
        );
        if let Verdict::Suppress(reason) = verdict {
            info!(
                project = %key.project,
                host = %key.hostname,
                service = %key.service,
                module = %key.module,
                status,
                reason = %reason,
                "alarm suppressed"
            );
            return Ok(NotifyOutcome::Suppressed(reason));
        }

        if self.config.test_mode {
            debug!(key = %key, status, "test mode, alarm not sent");
        } else {
            let notification = Notification::new(message, &key, status);
            self.channel.send(&notification).inspect_err(|e| {
                error!(
                    project = %key.project,
                    host = %key.hostname,
                    service = %key.service,
                    module = %key.module,
                    status,
                    error = %e,
                    "alarm delivery failed"
                );
            })?;
        }

        let event = self
            .store
            .insert_alarm(AlarmEvent::new(&key, message, status, now))?;
        info!(
            project = %key.project,
            host = %key.hostname,
            service = %key.service,
            module = %key.module,
            status,
            id = event.id,
            "alarm sent"
        );
        Ok(NotifyOutcome::Sent(event))
    }
}
