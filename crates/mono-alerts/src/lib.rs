//! Alert deduplication and issue escalation for monokit probes.
//!
//! Every probe run is a fresh, short-lived process. `mono-alerts` decides,
//! purely from persisted history, whether a detected condition should send a
//! chat alarm, be suppressed as a duplicate, or open, update or reopen a
//! Redmine ticket.
//!
//! # Components
//!
//! - [`AlarmDispatcher`]: chat notifications with count and interval limits
//! - [`IssueEscalator`]: ticket lifecycle driven by up/down transitions
//! - [`NewsBroadcaster`]: version-change announcements
//! - [`HistoryStore`]: the tuple-scoped history every decision is based on
//! - [`policy`]: the pure decision rules shared by the above
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use mono_alerts::{
//!     AlarmDispatcher, DispatcherConfig, Identity, MemoryHistory, NotifyOutcome, RateLimit,
//!     SuppressReason, channels::BotApiChannel,
//! };
//!
//! let store = Arc::new(MemoryHistory::new());
//! let config = DispatcherConfig::new(Identity::new("proj1", "host1"))
//!     .with_rate(RateLimit::new(0, 2))
//!     .test_mode(true);
//! let dispatcher = AlarmDispatcher::new(
//!     config,
//!     store.clone(),
//!     Box::new(BotApiChannel::new("", Vec::new())),
//! );
//!
//! for _ in 0..2 {
//!     let outcome = dispatcher.notify("[disk] 92%", "diskProbe", "/var", "down").unwrap();
//!     assert!(matches!(outcome, NotifyOutcome::Sent(_)));
//! }
//!
//! let outcome = dispatcher.notify("[disk] 92%", "diskProbe", "/var", "down").unwrap();
//! assert_eq!(outcome, NotifyOutcome::Suppressed(SuppressReason::LimitReached));
//! assert_eq!(store.alarm_count(), 2);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod escalator;
pub mod history;
pub mod news;
pub mod policy;
pub mod tickets;
pub mod types;

#[cfg(test)]
mod testing;

/// `User-Agent` sent on every outbound request.
pub const USER_AGENT: &str = concat!("monokit/", env!("CARGO_PKG_VERSION"));

/// Timeout applied to every outbound HTTP call.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// Re-export main types at crate root
pub use channels::{
    BotApiChannel, Delivery, Notification, NotificationChannel, WebhookChannel,
    channel_from_config,
};
pub use dispatcher::{AlarmDispatcher, DispatcherConfig, NotifyOutcome};
pub use error::{AlertError, Result};
pub use escalator::{EscalateOutcome, EscalatorConfig, IssueEscalator};
pub use history::{HistoryStore, MemoryHistory, VersionStore};
pub use news::{NewsBroadcaster, NewsConfig, VersionChange};
pub use policy::{RateLimit, Reconciliation, SuppressReason};
pub use tickets::{RedmineClient, RemoteIssue, TicketBackend};
pub use types::{
    AlarmEvent, Identity, IssueDraft, IssueDraftBuilder, IssueEvent, IssuePriority, NewsItem,
    STATUS_DOWN, STATUS_UP, TicketStatus, TupleKey, VersionRecord,
};
