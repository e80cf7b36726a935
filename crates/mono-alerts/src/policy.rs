//! Deduplication, rate limiting and ticket reconciliation rules.
//!
//! Everything here is pure: callers load history, pass it in together with
//! the current time, and act on the returned decision.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlarmEvent, IssueEvent, STATUS_DOWN, STATUS_UP};

/// Hours a status change looks back for a ticket to reuse.
pub const RECENT_SIMILAR_HOURS: i64 = 6;

/// How far back a status change looks for a ticket to reuse.
#[must_use]
pub fn recent_similar_window() -> TimeDelta {
    TimeDelta::hours(RECENT_SIMILAR_HOURS)
}

/// A stored row the policy can reason about.
pub trait HistoryRecord {
    /// Logical status of the row.
    fn status(&self) -> &str;

    /// When the row was written.
    fn created_at(&self) -> DateTime<Utc>;
}

impl HistoryRecord for AlarmEvent {
    fn status(&self) -> &str {
        &self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl HistoryRecord for IssueEvent {
    fn status(&self) -> &str {
        &self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Throttling settings for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Minimum time between two actions for the same tuple.
    pub interval: TimeDelta,
    /// Consecutive same-status actions allowed; 0 disables the count rule.
    pub limit: usize,
}

impl RateLimit {
    /// Creates a rate limit from configuration values.
    #[must_use]
    pub fn new(interval_minutes: u64, limit: usize) -> Self {
        let interval = i64::try_from(interval_minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .unwrap_or(TimeDelta::MAX);
        Self { interval, limit }
    }

    /// A rate limit that never suppresses.
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            interval: TimeDelta::zero(),
            limit: 0,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Why the engine decided not to act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressReason {
    /// The last `limit` rows already report this status.
    LimitReached,
    /// The previous action for the tuple is younger than the interval.
    IntervalNotElapsed,
    /// The channel is turned off in configuration.
    BackendDisabled,
}

impl SuppressReason {
    /// Returns a short machine-readable label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LimitReached => "limit reached",
            Self::IntervalNotElapsed => "interval not elapsed",
            Self::BackendDisabled => "backend disabled",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the throttling check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Go ahead.
    Proceed,
    /// Do nothing.
    Suppress(SuppressReason),
}

/// Returns true if the newest `limit` rows all carry `status` and there are
/// at least `limit` of them.
pub fn limit_reached<R: HistoryRecord>(window: &[R], status: &str, limit: usize) -> bool {
    if limit == 0 || window.len() < limit {
        return false;
    }
    window[..limit].iter().all(|r| r.status() == status)
}

/// Returns true if `last` is younger than `interval` at `now`.
pub fn within_interval<R: HistoryRecord>(last: &R, interval: TimeDelta, now: DateTime<Utc>) -> bool {
    interval > TimeDelta::zero() && now.signed_duration_since(last.created_at()) < interval
}

/// Decides whether an action for `status` may go ahead.
///
/// `window` holds the newest rows for the tuple, newest first, and must
/// start with `most_recent`. The count rule runs first; the interval rule is
/// skipped in test mode.
pub fn check<R: HistoryRecord>(
    most_recent: Option<&R>,
    window: &[R],
    status: &str,
    rate: RateLimit,
    now: DateTime<Utc>,
    test_mode: bool,
) -> Verdict {
    let Some(most_recent) = most_recent else {
        return Verdict::Proceed;
    };

    if limit_reached(window, status, rate.limit) {
        return Verdict::Suppress(SuppressReason::LimitReached);
    }

    if !test_mode && within_interval(most_recent, rate.interval, now) {
        return Verdict::Suppress(SuppressReason::IntervalNotElapsed);
    }

    Verdict::Proceed
}

/// What to do with the ticket backend when a tuple's status changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Open a new ticket.
    Create,
    /// Move an existing ticket back to an active workflow state.
    Reopen {
        /// Ticket to reopen.
        ticket_id: i64,
    },
    /// Rewrite an existing ticket's workflow state and notes.
    Update {
        /// Ticket to update.
        ticket_id: i64,
    },
}

/// Picks the ticket action for a status change.
///
/// A problem returning shortly after it cleared reopens the ticket that was
/// just closed; that rule takes precedence over a plain update. Without a
/// recent ticket on the tuple a new one is created.
pub fn reconcile(previous: &str, desired: &str, recent_ticket: Option<i64>) -> Reconciliation {
    match recent_ticket {
        None => Reconciliation::Create,
        Some(ticket_id) if desired == STATUS_DOWN && previous == STATUS_UP => {
            Reconciliation::Reopen { ticket_id }
        }
        Some(ticket_id) => Reconciliation::Update { ticket_id },
    }
}
