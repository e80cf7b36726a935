//! Core types for the engine.
//!
//! - [`TupleKey`]: the `(project, host, service, module)` scope of every decision
//! - [`Identity`]: the process-wide `(project, host)` half of the tuple
//! - [`AlarmEvent`]: one row per chat notification actually sent
//! - [`IssueEvent`]: one row per locally known state of a ticket
//! - [`IssueDraft`]: what a probe hands to the escalator
//! - [`NewsItem`] and [`VersionRecord`]: version-change announcements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status a probe reports when its condition is healthy.
pub const STATUS_UP: &str = "up";

/// Status a probe reports when its condition is a problem.
pub const STATUS_DOWN: &str = "down";

/// The project and host this process reports for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Project identifier.
    pub project: String,
    /// Hostname.
    pub hostname: String,
}

impl Identity {
    /// Creates an identity.
    #[must_use]
    pub fn new(project: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            hostname: hostname.into(),
        }
    }

    /// Builds the full tuple key for a probe and sub-check.
    #[must_use]
    pub fn key(&self, service: impl Into<String>, module: impl Into<String>) -> TupleKey {
        TupleKey {
            project: self.project.clone(),
            hostname: self.hostname.clone(),
            service: service.into(),
            module: module.into(),
        }
    }
}

impl From<&mono_config::GlobalConfig> for Identity {
    fn from(config: &mono_config::GlobalConfig) -> Self {
        Self::new(&config.project_identifier, &config.hostname)
    }
}

/// Scope of every deduplication and escalation decision.
///
/// `service` and `module` may be empty, meaning "host-wide".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleKey {
    /// Project identifier.
    pub project: String,
    /// Hostname.
    pub hostname: String,
    /// Probe name.
    pub service: String,
    /// Sub-check name.
    pub module: String,
}

impl std::fmt::Display for TupleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.project, self.hostname, self.service, self.module
        )
    }
}

/// A chat notification that was actually sent.
///
/// Rows are immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Sequence id assigned by the store; 0 until stored.
    pub id: i64,
    /// Project identifier.
    pub project_identifier: String,
    /// Hostname.
    pub hostname: String,
    /// Message text that was sent.
    pub content: String,
    /// Logical status, usually `up` or `down`.
    pub status: String,
    /// Probe name.
    pub service: String,
    /// Sub-check name.
    pub module: String,
    /// When the notification was sent.
    pub created_at: DateTime<Utc>,
}

impl AlarmEvent {
    /// Creates an unsaved event for the given tuple.
    #[must_use]
    pub fn new(
        key: &TupleKey,
        content: impl Into<String>,
        status: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            project_identifier: key.project.clone(),
            hostname: key.hostname.clone(),
            content: content.into(),
            status: status.into(),
            service: key.service.clone(),
            module: key.module.clone(),
            created_at,
        }
    }

    /// Returns the tuple this event belongs to.
    #[must_use]
    pub fn key(&self) -> TupleKey {
        TupleKey {
            project: self.project_identifier.clone(),
            hostname: self.hostname.clone(),
            service: self.service.clone(),
            module: self.module.clone(),
        }
    }
}

/// Redmine issue priorities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssuePriority {
    /// Highest priority.
    Urgent,
    /// High priority.
    High,
    /// Normal priority.
    Normal,
    /// Low priority.
    Low,
    /// Lowest priority.
    Default,
}

impl IssuePriority {
    /// Returns the Redmine priority id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Urgent => 1,
            Self::High => 2,
            Self::Normal => 3,
            Self::Low => 4,
            Self::Default => 5,
        }
    }
}

impl From<IssuePriority> for i64 {
    fn from(priority: IssuePriority) -> Self {
        priority.id()
    }
}

/// Redmine workflow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// In progress.
    Working,
    /// Resolved.
    Resolved,
    /// Waiting for the customer.
    Feedback2,
    /// Closed.
    Closed,
    /// Paused.
    InBreak,
    /// Waiting for an employee; used when a ticket needs attention again.
    Feedback,
}

impl TicketStatus {
    /// Returns the Redmine status id.
    #[must_use]
    pub const fn id(&self) -> i64 {
        match self {
            Self::Working => 2,
            Self::Resolved => 3,
            Self::Feedback2 => 4,
            Self::Closed => 5,
            Self::InBreak => 7,
            Self::Feedback => 8,
        }
    }
}

impl From<TicketStatus> for i64 {
    fn from(status: TicketStatus) -> Self {
        status.id()
    }
}

/// Redmine tracker used when a draft does not name one.
pub const DEFAULT_TRACKER_ID: i64 = 7;

/// One locally known state of a ticket.
///
/// The newest row for a tuple (by `id`) carries the last known logical
/// status. Updates and reopens append a superseding row that keeps the same
/// `ticket_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Sequence id assigned by the store; 0 until stored.
    pub id: i64,
    /// External ticket id; 0 until the ticket exists.
    pub ticket_id: i64,
    /// Journal notes sent with updates.
    pub notes: String,
    /// Redmine tracker id.
    pub tracker_id: i64,
    /// Ticket body.
    pub description: String,
    /// Ticket title.
    pub subject: String,
    /// Redmine priority id.
    pub priority_id: i64,
    /// Redmine workflow status id.
    pub ticket_status_id: i64,
    /// Assignee, empty when unassigned.
    pub assigned_to_id: String,
    /// Project identifier.
    pub project_identifier: String,
    /// Hostname.
    pub hostname: String,
    /// Logical status, usually `up` or `down`.
    pub status: String,
    /// Probe name.
    pub service: String,
    /// Sub-check name.
    pub module: String,
    /// When this row was written.
    pub created_at: DateTime<Utc>,
}

impl IssueEvent {
    /// Returns the tuple this event belongs to.
    #[must_use]
    pub fn key(&self) -> TupleKey {
        TupleKey {
            project: self.project_identifier.clone(),
            hostname: self.hostname.clone(),
            service: self.service.clone(),
            module: self.module.clone(),
        }
    }
}

/// A detected condition that may need a ticket.
///
/// Built by probes with [`IssueDraft::builder`]; the escalator stamps the
/// project and host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueDraft {
    /// Probe name.
    pub service: String,
    /// Sub-check name.
    pub module: String,
    /// Desired logical status.
    pub status: String,
    /// Ticket title.
    pub subject: String,
    /// Ticket body.
    pub description: String,
    /// Journal notes used on update.
    pub notes: String,
    /// Redmine tracker id.
    pub tracker_id: i64,
    /// Redmine priority id.
    pub priority_id: i64,
    /// Redmine workflow status id to create or update with.
    pub ticket_status_id: i64,
    /// Assignee, empty when unassigned.
    pub assigned_to_id: String,
}

impl IssueDraft {
    /// Starts building a draft.
    #[must_use]
    pub fn builder(subject: impl Into<String>, status: impl Into<String>) -> IssueDraftBuilder {
        IssueDraftBuilder::new(subject, status)
    }

    /// Turns the draft into an unsaved event for the given identity.
    #[must_use]
    pub fn into_event(self, identity: &Identity, created_at: DateTime<Utc>) -> IssueEvent {
        IssueEvent {
            id: 0,
            ticket_id: 0,
            notes: self.notes,
            tracker_id: self.tracker_id,
            description: self.description,
            subject: self.subject,
            priority_id: self.priority_id,
            ticket_status_id: self.ticket_status_id,
            assigned_to_id: self.assigned_to_id,
            project_identifier: identity.project.clone(),
            hostname: identity.hostname.clone(),
            status: self.status,
            service: self.service,
            module: self.module,
            created_at,
        }
    }
}

/// Builder for [`IssueDraft`].
#[derive(Debug, Clone)]
pub struct IssueDraftBuilder {
    draft: IssueDraft,
}

impl IssueDraftBuilder {
    /// Creates a builder with default tracker, priority and workflow status.
    ///
    /// The workflow status defaults to Resolved for an `up` report and to
    /// Feedback otherwise.
    #[must_use]
    pub fn new(subject: impl Into<String>, status: impl Into<String>) -> Self {
        let status = status.into();
        let ticket_status = if status == STATUS_UP {
            TicketStatus::Resolved
        } else {
            TicketStatus::Feedback
        };
        Self {
            draft: IssueDraft {
                service: String::new(),
                module: String::new(),
                status,
                subject: subject.into(),
                description: String::new(),
                notes: String::new(),
                tracker_id: DEFAULT_TRACKER_ID,
                priority_id: IssuePriority::Normal.id(),
                ticket_status_id: ticket_status.id(),
                assigned_to_id: String::new(),
            },
        }
    }

    /// Sets the probe name.
    #[must_use]
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.draft.service = service.into();
        self
    }

    /// Sets the sub-check name.
    #[must_use]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.draft.module = module.into();
        self
    }

    /// Sets the ticket body.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.draft.description = description.into();
        self
    }

    /// Sets the journal notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.draft.notes = notes.into();
        self
    }

    /// Sets the tracker id.
    #[must_use]
    pub const fn tracker(mut self, tracker_id: i64) -> Self {
        self.draft.tracker_id = tracker_id;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn priority(mut self, priority: impl Into<i64>) -> Self {
        self.draft.priority_id = priority.into();
        self
    }

    /// Sets the workflow status the ticket should be in.
    #[must_use]
    pub fn ticket_status(mut self, status: impl Into<i64>) -> Self {
        self.draft.ticket_status_id = status.into();
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub fn assigned_to(mut self, assignee: impl Into<String>) -> Self {
        self.draft.assigned_to_id = assignee.into();
        self
    }

    /// Finishes the draft.
    #[must_use]
    pub fn build(self) -> IssueDraft {
        self.draft
    }
}

/// A version-change announcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Sequence id assigned by the store; 0 until stored.
    pub id: i64,
    /// Headline.
    pub title: String,
    /// Body.
    pub description: String,
    /// Project identifier.
    pub project_identifier: String,
    /// Hostname.
    pub hostname: String,
    /// Whether the ticket backend accepted the item.
    pub published: bool,
    /// When the item was recorded.
    pub created_at: DateTime<Utc>,
}

impl NewsItem {
    /// Creates an unsaved, unpublished item.
    #[must_use]
    pub fn new(
        identity: &Identity,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            title: title.into(),
            description: description.into(),
            project_identifier: identity.project.clone(),
            hostname: identity.hostname.clone(),
            published: false,
            created_at,
        }
    }
}

/// Last known version of a monitored application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Application name, unique.
    pub name: String,
    /// Plain version string.
    pub version: String,
    /// JSON document for applications with several components.
    pub version_multi: String,
    /// `installed` or `not-installed`.
    pub status: String,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}
