//! Issue escalator.
//!
//! Turns persistent problems into Redmine tickets and follows the tuple's
//! up/down lifecycle:
//!
//! 1. No history for the tuple: create a ticket.
//! 2. Count or interval rule fires: suppress.
//! 3. Newest row already has the desired status: no-op.
//! 4. Status changes and a ticket for the tuple was touched within the last
//!    six hours: reopen it (down after up) or update it (any other change).
//! 5. Otherwise: create a ticket.
//!
//! Updates and reopens append a superseding row carrying the same ticket id,
//! so the newest row always reflects the last known status.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mono_config::GlobalConfig;
use tracing::{debug, error, info};

use crate::error::{AlertError, Result};
use crate::history::HistoryStore;
use crate::policy::{self, RateLimit, Reconciliation, SuppressReason, Verdict};
use crate::tickets::{IssueUpdate, NewIssue, TicketBackend};
use crate::types::{Identity, IssueDraft, IssueEvent, TicketStatus};

/// Settings for [`IssueEscalator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalatorConfig {
    /// Project and host stamped on every draft.
    pub identity: Identity,
    /// Whether tickets are managed at all.
    pub enabled: bool,
    /// Throttling for ticket actions.
    pub rate: RateLimit,
    /// Skip the network while keeping decisions and persistence.
    pub test_mode: bool,
}

impl EscalatorConfig {
    /// Creates a config for an enabled backend with no throttling.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            enabled: true,
            rate: RateLimit::unlimited(),
            test_mode: false,
        }
    }

    /// Builds the escalator settings from the global configuration.
    #[must_use]
    pub fn from_global(config: &GlobalConfig, test_mode: bool) -> Self {
        Self {
            identity: Identity::from(config),
            enabled: config.redmine.enabled,
            rate: RateLimit::new(config.redmine.interval, config.redmine.limit),
            test_mode,
        }
    }

    /// Sets the rate limit.
    #[must_use]
    pub const fn with_rate(mut self, rate: RateLimit) -> Self {
        self.rate = rate;
        self
    }

    /// Sets whether the backend is enabled.
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

/// Outcome of [`IssueEscalator::escalate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalateOutcome {
    /// A new ticket was opened.
    Created(IssueEvent),
    /// An existing ticket's workflow state and notes were rewritten.
    Updated(IssueEvent),
    /// A recently resolved ticket was moved back to Feedback.
    Reopened(IssueEvent),
    /// The newest row already reflects the desired status.
    NoOp(IssueEvent),
    /// Nothing was done.
    Suppressed(SuppressReason),
}

impl EscalateOutcome {
    /// Returns a short label for the outcome.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Updated(_) => "updated",
            Self::Reopened(_) => "reopened",
            Self::NoOp(_) => "no-op",
            Self::Suppressed(_) => "suppressed",
        }
    }

    /// Returns the row the outcome refers to, if any.
    #[must_use]
    pub const fn event(&self) -> Option<&IssueEvent> {
        match self {
            Self::Created(e) | Self::Updated(e) | Self::Reopened(e) | Self::NoOp(e) => Some(e),
            Self::Suppressed(_) => None,
        }
    }
}

/// Opens, updates and reopens tickets from probe drafts.
pub struct IssueEscalator {
    config: EscalatorConfig,
    store: Arc<dyn HistoryStore>,
    backend: Option<Box<dyn TicketBackend>>,
}

impl fmt::Debug for IssueEscalator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssueEscalator")
            .field("config", &self.config)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl IssueEscalator {
    /// Creates an escalator.
    ///
    /// `backend` is `None` when Redmine credentials are missing; escalations
    /// outside test mode then fail with `MisconfiguredCredentials`.
    #[must_use]
    pub fn new(
        config: EscalatorConfig,
        store: Arc<dyn HistoryStore>,
        backend: Option<Box<dyn TicketBackend>>,
    ) -> Self {
        Self {
            config,
            store,
            backend,
        }
    }

    /// Returns the escalator settings.
    #[must_use]
    pub const fn config(&self) -> &EscalatorConfig {
        &self.config
    }

    /// Escalates a draft.
    ///
    /// # Errors
    ///
    /// - `AlertError::MisconfiguredCredentials` if the backend is enabled
    ///   but has no URL or API key
    /// - `AlertError::RemoteCallFailed` if Redmine rejects the call (nothing
    ///   is recorded)
    /// - `AlertError::Inconsistent` if Redmine accepted a write that could
    ///   not be recorded locally
    /// - `AlertError::QueryFailed` if history is unavailable
    pub fn escalate(&self, draft: IssueDraft) -> Result<EscalateOutcome> {
        self.escalate_at(draft, Utc::now())
    }

    /// Same as [`escalate`](Self::escalate) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`escalate`](Self::escalate).
    pub fn escalate_at(&self, draft: IssueDraft, now: DateTime<Utc>) -> Result<EscalateOutcome> {
        let event = draft.into_event(&self.config.identity, now);
        let key = event.key();

        if !self.config.enabled {
            debug!(key = %key, status = %event.status, "ticket backend disabled");
            return Ok(EscalateOutcome::Suppressed(SuppressReason::BackendDisabled));
        }

        let backend = if self.config.test_mode {
            None
        } else {
            Some(self.backend()?)
        };

        // The head of the window is the most recent ticket state.
        let window = self.store.last_issues(&key, self.config.rate.limit.max(1))?;
        let Some(last) = window.first() else {
            return self.create(event, backend);
        };

        let verdict = policy::check(
            Some(last),
            &window,
            &event.status,
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
                status = %event.status,
                reason = %reason,
                "escalation suppressed"
            );
            return Ok(EscalateOutcome::Suppressed(reason));
        }

        if last.status == event.status {
            debug!(
                key = %key,
                status = %event.status,
                ticket_id = last.ticket_id,
                "ticket already reflects status"
            );
            return Ok(EscalateOutcome::NoOp(last.clone()));
        }

        let recent = self
            .store
            .recent_issue(&key, now - policy::recent_similar_window())?;
        match policy::reconcile(&last.status, &event.status, recent.map(|e| e.ticket_id)) {
            Reconciliation::Create => self.create(event, backend),
            Reconciliation::Reopen { ticket_id } => {
                if let Some(backend) = backend {
                    backend.update_issue(ticket_id, &IssueUpdate::reopen())?;
                }
                let event = IssueEvent {
                    ticket_id,
                    ticket_status_id: TicketStatus::Feedback.id(),
                    ..event
                };
                let stored = self.record(event, backend.is_some())?;
                info!(key = %key, ticket_id, "ticket reopened");
                Ok(EscalateOutcome::Reopened(stored))
            }
            Reconciliation::Update { ticket_id } => {
                if let Some(backend) = backend {
                    let update = IssueUpdate::new(event.ticket_status_id, event.notes.clone());
                    backend.update_issue(ticket_id, &update)?;
                }
                let event = IssueEvent { ticket_id, ..event };
                let stored = self.record(event, backend.is_some())?;
                info!(
                    key = %key,
                    ticket_id,
                    status = %stored.status,
                    ticket_status_id = stored.ticket_status_id,
                    "ticket updated"
                );
                Ok(EscalateOutcome::Updated(stored))
            }
        }
    }

    fn backend(&self) -> Result<&dyn TicketBackend> {
        self.backend
            .as_deref()
            .ok_or_else(|| AlertError::MisconfiguredCredentials {
                reason: "redmine is enabled but url or api-key is missing".to_string(),
            })
    }

    fn create(
        &self,
        mut event: IssueEvent,
        backend: Option<&dyn TicketBackend>,
    ) -> Result<EscalateOutcome> {
        event.ticket_id = match backend {
            Some(backend) => backend.create_issue(&NewIssue::from(&event))?,
            None => self.store.max_ticket_id()? + 1,
        };

        let stored = self.record(event, backend.is_some())?;
        info!(
            project = %stored.project_identifier,
            host = %stored.hostname,
            service = %stored.service,
            module = %stored.module,
            status = %stored.status,
            ticket_id = stored.ticket_id,
            "ticket created"
        );
        Ok(EscalateOutcome::Created(stored))
    }

    /// Persists a row; after a remote write a failure becomes `Inconsistent`.
    fn record(&self, event: IssueEvent, remote_written: bool) -> Result<IssueEvent> {
        let ticket_id = event.ticket_id;
        match self.store.insert_issue(event) {
            Ok(stored) => Ok(stored),
            Err(e) if remote_written => {
                error!(
                    ticket_id,
                    error = %e,
                    "ticket written to redmine but not recorded locally"
                );
                Err(AlertError::Inconsistent {
                    ticket_id,
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e),
        }
    }
}
