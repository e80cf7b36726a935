//! Recording doubles shared by the engine's unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::channels::{Delivery, Notification, NotificationChannel};
use crate::error::{AlertError, Result};
use crate::history::{HistoryStore, MemoryHistory, VersionStore};
use crate::tickets::{IssueUpdate, NewIssue, NewsPost, RemoteIssue, TicketBackend};
use crate::types::{AlarmEvent, IssueEvent, NewsItem, TupleKey, VersionRecord};

/// Channel that records every message and can be told to fail.
#[derive(Debug, Clone, Default)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }
}

impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, notification: &Notification) -> Result<Delivery> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AlertError::SendFailed {
                channel: "recording".to_string(),
                reason: "HTTP 500".to_string(),
            });
        }
        self.sent.lock().push(notification.clone());
        Ok(Delivery {
            channel: "recording".to_string(),
            endpoints: 1,
        })
    }
}

/// A call received by [`RecordingBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create(NewIssue),
    Update(i64, IssueUpdate),
    Get(i64),
    News(String, NewsPost),
}

/// Ticket backend that records calls and hands out sequential ids.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    next_id: Arc<AtomicI64>,
    fail: Arc<AtomicBool>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: Arc::default(),
            next_id: Arc::new(AtomicI64::new(100)),
            fail: Arc::default(),
        }
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    fn check(&self, operation: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AlertError::RemoteCallFailed {
                operation: operation.to_string(),
                reason: "HTTP 422".to_string(),
            });
        }
        Ok(())
    }
}

impl TicketBackend for RecordingBackend {
    fn create_issue(&self, issue: &NewIssue) -> Result<i64> {
        self.check("create issue")?;
        self.calls.lock().push(BackendCall::Create(issue.clone()));
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn update_issue(&self, ticket_id: i64, update: &IssueUpdate) -> Result<()> {
        self.check("update issue")?;
        self.calls
            .lock()
            .push(BackendCall::Update(ticket_id, update.clone()));
        Ok(())
    }

    fn get_issue(&self, ticket_id: i64) -> Result<RemoteIssue> {
        self.check("read issue")?;
        self.calls.lock().push(BackendCall::Get(ticket_id));
        Ok(RemoteIssue {
            id: ticket_id,
            ..RemoteIssue::default()
        })
    }

    fn create_news(&self, project: &str, news: &NewsPost) -> Result<()> {
        self.check("create news")?;
        self.calls
            .lock()
            .push(BackendCall::News(project.to_string(), news.clone()));
        Ok(())
    }
}

/// History whose writes can be made to fail while reads keep working.
#[derive(Debug, Default)]
pub struct FlakyHistory {
    inner: MemoryHistory,
    fail_writes: AtomicBool,
}

impl FlakyHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryHistory {
        &self.inner
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AlertError::query("database is locked"));
        }
        Ok(())
    }
}

impl HistoryStore for FlakyHistory {
    fn last_alarms(&self, key: &TupleKey, limit: usize) -> Result<Vec<AlarmEvent>> {
        self.inner.last_alarms(key, limit)
    }

    fn insert_alarm(&self, event: AlarmEvent) -> Result<AlarmEvent> {
        self.check()?;
        self.inner.insert_alarm(event)
    }

    fn last_issues(&self, key: &TupleKey, limit: usize) -> Result<Vec<IssueEvent>> {
        self.inner.last_issues(key, limit)
    }

    fn recent_issue(&self, key: &TupleKey, since: DateTime<Utc>) -> Result<Option<IssueEvent>> {
        self.inner.recent_issue(key, since)
    }

    fn insert_issue(&self, event: IssueEvent) -> Result<IssueEvent> {
        self.check()?;
        self.inner.insert_issue(event)
    }

    fn max_ticket_id(&self) -> Result<i64> {
        self.inner.max_ticket_id()
    }

    fn insert_news(&self, item: NewsItem) -> Result<NewsItem> {
        self.check()?;
        self.inner.insert_news(item)
    }

    fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>> {
        self.inner.recent_news(limit)
    }
}

impl VersionStore for FlakyHistory {
    fn version(&self, name: &str) -> Result<Option<VersionRecord>> {
        self.inner.version(name)
    }

    fn upsert_version(&self, record: VersionRecord) -> Result<()> {
        self.check()?;
        self.inner.upsert_version(record)
    }
}
