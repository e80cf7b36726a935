//! Redmine ticket backend.
//!
//! Request and response bodies are typed per endpoint:
//!
//! | call            | method | path                                  | body                |
//! |-----------------|--------|---------------------------------------|---------------------|
//! | create issue    | POST   | `/issues.json`                        | `{"issue": {...}}`  |
//! | update / reopen | PUT    | `/issues/{id}.json`                   | `{"issue": {...}}`  |
//! | read issue      | GET    | `/issues/{id}.json`                   |                     |
//! | create news     | POST   | `/projects/{project}/news.json`       | `{"news": {...}}`   |

use std::fmt;
use std::time::Duration;

use mono_config::RedmineConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{AlertError, Result};
use crate::types::{IssueEvent, TicketStatus};
use crate::{HTTP_TIMEOUT_SECS, USER_AGENT};

/// Header carrying the Redmine API key (`X-Redmine-API-Key`).
pub const API_KEY_HEADER: &str = "x-redmine-api-key";

/// Fields sent when opening a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    /// Redmine project identifier.
    pub project_id: String,
    /// Tracker id.
    pub tracker_id: i64,
    /// Title.
    pub subject: String,
    /// Body.
    pub description: String,
    /// Priority id.
    pub priority_id: i64,
    /// Workflow status id.
    pub status_id: i64,
    /// Assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<String>,
}

impl From<&IssueEvent> for NewIssue {
    fn from(event: &IssueEvent) -> Self {
        Self {
            project_id: event.project_identifier.clone(),
            tracker_id: event.tracker_id,
            subject: event.subject.clone(),
            description: event.description.clone(),
            priority_id: event.priority_id,
            status_id: event.ticket_status_id,
            assigned_to_id: (!event.assigned_to_id.is_empty())
                .then(|| event.assigned_to_id.clone()),
        }
    }
}

/// Fields sent when changing a ticket's workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUpdate {
    /// New workflow status id.
    pub status_id: i64,
    /// Journal entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl IssueUpdate {
    /// An update that sets the workflow status and adds a journal entry.
    ///
    /// Empty notes are omitted from the request.
    #[must_use]
    pub fn new(status_id: i64, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        Self {
            status_id,
            notes: (!notes.is_empty()).then_some(notes),
        }
    }

    /// An update that moves the ticket back to Feedback.
    #[must_use]
    pub const fn reopen() -> Self {
        Self {
            status_id: TicketStatus::Feedback.id(),
            notes: None,
        }
    }
}

/// Fields sent when publishing a news item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPost {
    /// Headline.
    pub title: String,
    /// Body.
    pub description: String,
}

/// A `{id, name}` reference in a Redmine response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Id.
    pub id: i64,
    /// Display name.
    #[serde(default)]
    pub name: String,
}

/// A ticket as returned by the read endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteIssue {
    /// Ticket id.
    pub id: i64,
    /// Title.
    pub subject: String,
    /// Body.
    pub description: String,
    /// Project.
    pub project: Option<NamedRef>,
    /// Tracker.
    pub tracker: Option<NamedRef>,
    /// Workflow status.
    pub status: Option<NamedRef>,
    /// Priority.
    pub priority: Option<NamedRef>,
    /// Assignee.
    pub assigned_to: Option<NamedRef>,
    /// Creation time as reported by Redmine.
    pub created_on: Option<String>,
    /// Last update time as reported by Redmine.
    pub updated_on: Option<String>,
}

#[derive(Serialize)]
struct IssueEnvelope<'a, T> {
    issue: &'a T,
}

#[derive(Serialize)]
struct NewsEnvelope<'a> {
    news: &'a NewsPost,
}

#[derive(Deserialize)]
struct IssueResponse<T> {
    issue: T,
}

#[derive(Deserialize)]
struct CreatedIssue {
    id: i64,
}

/// Remote ticketing operations used by the escalator and news broadcaster.
pub trait TicketBackend: Send + Sync + fmt::Debug {
    /// Opens a ticket and returns its id.
    fn create_issue(&self, issue: &NewIssue) -> Result<i64>;

    /// Changes the workflow state of a ticket.
    fn update_issue(&self, ticket_id: i64, update: &IssueUpdate) -> Result<()>;

    /// Reads a ticket.
    fn get_issue(&self, ticket_id: i64) -> Result<RemoteIssue>;

    /// Publishes a news item in a project.
    fn create_news(&self, project: &str, news: &NewsPost) -> Result<()>;
}

/// Blocking Redmine REST client.
#[derive(Debug, Clone)]
pub struct RedmineClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl RedmineClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::MisconfiguredCredentials` if the URL or API key is
    /// missing, or `AlertError::InvalidConfig` if the client cannot be built.
    pub fn from_config(config: &RedmineConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(AlertError::MisconfiguredCredentials {
                reason: "redmine.url is empty".to_string(),
            });
        }
        if config.api_key.trim().is_empty() {
            return Err(AlertError::MisconfiguredCredentials {
                reason: "redmine.api-key is empty".to_string(),
            });
        }
        Self::new(config.base_url(), config.api_key.trim())
    }

    /// Creates a client for a base URL and API key.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidConfig` if the key is not a valid header
    /// value or the client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: &str) -> Result<Self> {
        let mut key = HeaderValue::from_str(api_key).map_err(|e| AlertError::InvalidConfig {
            reason: format!("redmine api key is not a valid header value: {e}"),
        })?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AlertError::InvalidConfig {
                reason: format!("cannot build HTTP client: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn execute(
        &self,
        operation: &str,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let response = request.send().map_err(|e| {
            error!(operation, error = %e, "redmine request failed");
            remote_failed(operation, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            error!(operation, status = status.as_u16(), body = %body, "redmine rejected request");
            return Err(remote_failed(
                operation,
                format!("HTTP {}", status.as_u16()),
            ));
        }

        debug!(operation, status = status.as_u16(), "redmine request succeeded");
        Ok(response)
    }
}

fn remote_failed(operation: &str, reason: impl fmt::Display) -> AlertError {
    AlertError::RemoteCallFailed {
        operation: operation.to_string(),
        reason: reason.to_string(),
    }
}

impl TicketBackend for RedmineClient {
    fn create_issue(&self, issue: &NewIssue) -> Result<i64> {
        let operation = "create issue";
        let response = self.execute(
            operation,
            self.client
                .post(self.url("/issues.json"))
                .json(&IssueEnvelope { issue }),
        )?;

        let created: IssueResponse<CreatedIssue> = response
            .json()
            .map_err(|e| remote_failed(operation, format!("unreadable response: {e}")))?;
        Ok(created.issue.id)
    }

    fn update_issue(&self, ticket_id: i64, update: &IssueUpdate) -> Result<()> {
        let operation = format!("update issue #{ticket_id}");
        self.execute(
            &operation,
            self.client
                .put(self.url(&format!("/issues/{ticket_id}.json")))
                .json(&IssueEnvelope { issue: update }),
        )?;
        Ok(())
    }

    fn get_issue(&self, ticket_id: i64) -> Result<RemoteIssue> {
        let operation = format!("read issue #{ticket_id}");
        let response = self.execute(
            &operation,
            self.client.get(self.url(&format!("/issues/{ticket_id}.json"))),
        )?;

        let issue: IssueResponse<RemoteIssue> = response
            .json()
            .map_err(|e| remote_failed(&operation, format!("unreadable response: {e}")))?;
        Ok(issue.issue)
    }

    fn create_news(&self, project: &str, news: &NewsPost) -> Result<()> {
        self.execute(
            "create news",
            self.client
                .post(self.url(&format!("/projects/{project}/news.json")))
                .json(&NewsEnvelope { news }),
        )?;
        Ok(())
    }
}
