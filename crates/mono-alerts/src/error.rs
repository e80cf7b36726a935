//! Error types for the mono-alerts crate.

use thiserror::Error;

/// Errors that can occur while notifying or escalating.
///
/// Suppressions and no-ops are not errors; they are reported through
/// [`crate::NotifyOutcome`] and [`crate::EscalateOutcome`].
#[derive(Debug, Error)]
pub enum AlertError {
    /// The ticket backend is enabled but its URL or API key is missing.
    #[error("ticket backend misconfigured: {reason}")]
    MisconfiguredCredentials {
        /// What is missing.
        reason: String,
    },

    /// A chat notification could not be delivered.
    #[error("notification via {channel} failed: {reason}")]
    SendFailed {
        /// Channel that failed.
        channel: String,
        /// Transport error or HTTP status.
        reason: String,
    },

    /// A call to the ticket backend failed.
    #[error("{operation} failed: {reason}")]
    RemoteCallFailed {
        /// The remote operation, e.g. `create issue`.
        operation: String,
        /// Transport error or HTTP status.
        reason: String,
    },

    /// The history store could not be read or written.
    #[error("history query failed: {reason}")]
    QueryFailed {
        /// The store's error message.
        reason: String,
    },

    /// The ticket backend accepted a write but the local record could not be
    /// stored. The external id is kept so an operator can reconcile.
    #[error("ticket #{ticket_id} was written remotely but not recorded locally: {reason}")]
    Inconsistent {
        /// External ticket id that has no local row.
        ticket_id: i64,
        /// The store's error message.
        reason: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A configuration value cannot be used by the engine.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}

impl AlertError {
    /// Returns true if the error should abort the calling probe.
    ///
    /// Delivery failures are retried by the next scheduled run, so they are
    /// not fatal; store and configuration failures are.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::QueryFailed { .. }
                | Self::MisconfiguredCredentials { .. }
                | Self::Inconsistent { .. }
                | Self::InvalidConfig { .. }
        )
    }

    pub(crate) fn query(reason: impl std::fmt::Display) -> Self {
        Self::QueryFailed {
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for alert operations.
pub type Result<T> = std::result::Result<T, AlertError>;
