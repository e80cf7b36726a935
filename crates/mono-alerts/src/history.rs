//! History storage traits and an in-memory implementation.
//!
//! Each probe run is a fresh process, so "what happened last time" is always
//! a query against a [`HistoryStore`]. All tuple queries order by sequence id
//! descending; [`HistoryStore::last_alarm`] and [`HistoryStore::last_issue`]
//! are defined as the head of the corresponding `last_*` window so both
//! views always agree on which row is the most recent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;
use crate::types::{AlarmEvent, IssueEvent, NewsItem, TupleKey, VersionRecord};

/// Ordered, tuple-scoped storage for alarm, issue and news history.
pub trait HistoryStore: Send + Sync {
    /// Returns up to `limit` alarm events for the tuple, newest first.
    fn last_alarms(&self, key: &TupleKey, limit: usize) -> Result<Vec<AlarmEvent>>;

    /// Returns the most recent alarm event for the tuple.
    ///
    /// Always equal to the head of [`Self::last_alarms`]. The dispatcher
    /// reads the head of its rate window rather than calling this, so an
    /// override must not diverge from the window order.
    fn last_alarm(&self, key: &TupleKey) -> Result<Option<AlarmEvent>> {
        Ok(self.last_alarms(key, 1)?.into_iter().next())
    }

    /// Appends an alarm event and returns it with its sequence id.
    fn insert_alarm(&self, event: AlarmEvent) -> Result<AlarmEvent>;

    /// Returns up to `limit` issue events for the tuple, newest first.
    fn last_issues(&self, key: &TupleKey, limit: usize) -> Result<Vec<IssueEvent>>;

    /// Returns the most recent issue event for the tuple.
    ///
    /// Always equal to the head of [`Self::last_issues`], which is what the
    /// escalator reads.
    fn last_issue(&self, key: &TupleKey) -> Result<Option<IssueEvent>> {
        Ok(self.last_issues(key, 1)?.into_iter().next())
    }

    /// Returns the newest issue event for the tuple created at or after
    /// `since` that references an external ticket.
    fn recent_issue(&self, key: &TupleKey, since: DateTime<Utc>) -> Result<Option<IssueEvent>>;

    /// Appends an issue event and returns it with its sequence id.
    fn insert_issue(&self, event: IssueEvent) -> Result<IssueEvent>;

    /// Returns the largest external ticket id recorded, or 0.
    fn max_ticket_id(&self) -> Result<i64>;

    /// Appends a news item and returns it with its sequence id.
    fn insert_news(&self, item: NewsItem) -> Result<NewsItem>;

    /// Returns up to `limit` news items, newest first.
    fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>>;
}

/// Last-known-version table used by the news broadcaster.
pub trait VersionStore: Send + Sync {
    /// Returns the stored record for an application.
    fn version(&self, name: &str) -> Result<Option<VersionRecord>>;

    /// Inserts or replaces the record for `record.name`.
    fn upsert_version(&self, record: VersionRecord) -> Result<()>;
}

#[derive(Debug, Default)]
struct Tables {
    alarms: Vec<AlarmEvent>,
    issues: Vec<IssueEvent>,
    news: Vec<NewsItem>,
    versions: HashMap<String, VersionRecord>,
}

/// In-memory history with the same ordering rules as the SQLite store.
///
/// Rows are never removed, so a row's id is its position plus one.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    tables: RwLock<Tables>,
}

impl MemoryHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored alarm events.
    #[must_use]
    pub fn alarm_count(&self) -> usize {
        self.tables.read().alarms.len()
    }

    /// Returns the number of stored issue events.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.tables.read().issues.len()
    }

    /// Returns the number of stored news items.
    #[must_use]
    pub fn news_count(&self) -> usize {
        self.tables.read().news.len()
    }
}

fn next_id(len: usize) -> i64 {
    i64::try_from(len).unwrap_or(i64::MAX - 1) + 1
}

impl HistoryStore for MemoryHistory {
    fn last_alarms(&self, key: &TupleKey, limit: usize) -> Result<Vec<AlarmEvent>> {
        let tables = self.tables.read();
        Ok(tables
            .alarms
            .iter()
            .rev()
            .filter(|e| &e.key() == key)
            .take(limit)
            .cloned()
            .collect())
    }

    fn insert_alarm(&self, mut event: AlarmEvent) -> Result<AlarmEvent> {
        let mut tables = self.tables.write();
        event.id = next_id(tables.alarms.len());
        tables.alarms.push(event.clone());
        Ok(event)
    }

    fn last_issues(&self, key: &TupleKey, limit: usize) -> Result<Vec<IssueEvent>> {
        let tables = self.tables.read();
        Ok(tables
            .issues
            .iter()
            .rev()
            .filter(|e| &e.key() == key)
            .take(limit)
            .cloned()
            .collect())
    }

    fn recent_issue(&self, key: &TupleKey, since: DateTime<Utc>) -> Result<Option<IssueEvent>> {
        let tables = self.tables.read();
        Ok(tables
            .issues
            .iter()
            .rev()
            .find(|e| e.ticket_id > 0 && e.created_at >= since && &e.key() == key)
            .cloned())
    }

    fn insert_issue(&self, mut event: IssueEvent) -> Result<IssueEvent> {
        let mut tables = self.tables.write();
        event.id = next_id(tables.issues.len());
        tables.issues.push(event.clone());
        Ok(event)
    }

    fn max_ticket_id(&self) -> Result<i64> {
        let tables = self.tables.read();
        Ok(tables.issues.iter().map(|e| e.ticket_id).max().unwrap_or(0))
    }

    fn insert_news(&self, mut item: NewsItem) -> Result<NewsItem> {
        let mut tables = self.tables.write();
        item.id = next_id(tables.news.len());
        tables.news.push(item.clone());
        Ok(item)
    }

    fn recent_news(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let tables = self.tables.read();
        Ok(tables.news.iter().rev().take(limit).cloned().collect())
    }
}

impl VersionStore for MemoryHistory {
    fn version(&self, name: &str) -> Result<Option<VersionRecord>> {
        Ok(self.tables.read().versions.get(name).cloned())
    }

    fn upsert_version(&self, record: VersionRecord) -> Result<()> {
        self.tables
            .write()
            .versions
            .insert(record.name.clone(), record);
        Ok(())
    }
}
