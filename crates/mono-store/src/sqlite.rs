//! SQLite-backed history.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mono_alerts::{
    AlarmEvent, AlertError, HistoryStore, IssueEvent, NewsItem, TupleKey, VersionRecord,
    VersionStore,
};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::schema::SCHEMA;

/// How long a writer waits for another process's lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ALARM_COLUMNS: &str =
    "id, project_identifier, hostname, content, status, service, module, created_at";

const ISSUE_COLUMNS: &str = "id, ticket_id, notes, tracker_id, description, subject, priority_id, \
     ticket_status_id, assigned_to_id, project_identifier, hostname, status, service, module, \
     created_at";

const NEWS_COLUMNS: &str =
    "id, title, description, project_identifier, hostname, published, created_at";

/// Alarm, issue, news and version history in one SQLite file.
///
/// Several probe processes may open the same file at once; WAL mode and a
/// busy timeout let SQLite serialize their writes.
#[derive(Debug)]
pub struct SqliteHistory {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Opens or creates the database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created, the file cannot
    /// be opened, or the schema cannot be applied.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        Self::configure(&conn, false)?;
        debug!(path = %path.display(), "history database opened");

        Ok(Self {
            path: Some(path.to_path_buf()),
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn, true)?;
        Ok(Self {
            path: None,
            conn: Mutex::new(conn),
        })
    }

    fn configure(conn: &Connection, in_memory: bool) -> Result<()> {
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        let expected = if in_memory { "memory" } else { "wal" };
        if !mode.eq_ignore_ascii_case(expected) {
            return Err(StorageError::JournalMode(mode));
        }

        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Returns the database path, or `None` for an in-memory database.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns up to `limit` alarm events for the tuple, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn alarms(&self, key: &TupleKey, limit: usize) -> Result<Vec<AlarmEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ALARM_COLUMNS} FROM alarm_events
             WHERE project_identifier = ?1 AND hostname = ?2 AND service = ?3 AND module = ?4
             ORDER BY id DESC LIMIT ?5"
        ))?;
        let rows = stmt.query_map(
            params![
                &key.project,
                &key.hostname,
                &key.service,
                &key.module,
                sql_limit(limit)
            ],
            alarm_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Appends an alarm event.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn add_alarm(&self, mut event: AlarmEvent) -> Result<AlarmEvent> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO alarm_events
             (project_identifier, hostname, content, status, service, module, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?
        .execute(params![
            &event.project_identifier,
            &event.hostname,
            &event.content,
            &event.status,
            &event.service,
            &event.module,
            event.created_at.timestamp_millis(),
        ])?;
        event.id = conn.last_insert_rowid();
        Ok(event)
    }

    /// Returns up to `limit` issue events for the tuple, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn issues(&self, key: &TupleKey, limit: usize) -> Result<Vec<IssueEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issue_events
             WHERE project_identifier = ?1 AND hostname = ?2 AND service = ?3 AND module = ?4
             ORDER BY id DESC LIMIT ?5"
        ))?;
        let rows = stmt.query_map(
            params![
                &key.project,
                &key.hostname,
                &key.service,
                &key.module,
                sql_limit(limit)
            ],
            issue_from_row,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns the newest issue event for the tuple with a ticket, created at
    /// or after `since`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn recent_ticket(&self, key: &TupleKey, since: DateTime<Utc>) -> Result<Option<IssueEvent>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issue_events
             WHERE project_identifier = ?1 AND hostname = ?2 AND service = ?3 AND module = ?4
               AND ticket_id > 0 AND created_at >= ?5
             ORDER BY id DESC LIMIT 1"
        ))?;
        Ok(stmt
            .query_row(
                params![
                    &key.project,
                    &key.hostname,
                    &key.service,
                    &key.module,
                    since.timestamp_millis()
                ],
                issue_from_row,
            )
            .optional()?)
    }

    /// Appends an issue event.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn add_issue(&self, mut event: IssueEvent) -> Result<IssueEvent> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO issue_events
             (ticket_id, notes, tracker_id, description, subject, priority_id, ticket_status_id,
              assigned_to_id, project_identifier, hostname, status, service, module, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )?
        .execute(params![
            event.ticket_id,
            &event.notes,
            event.tracker_id,
            &event.description,
            &event.subject,
            event.priority_id,
            event.ticket_status_id,
            &event.assigned_to_id,
            &event.project_identifier,
            &event.hostname,
            &event.status,
            &event.service,
            &event.module,
            event.created_at.timestamp_millis(),
        ])?;
        event.id = conn.last_insert_rowid();
        Ok(event)
    }

    /// Returns the largest ticket id on record, or 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn highest_ticket_id(&self) -> Result<i64> {
        let conn = self.conn.lock();
        Ok(conn.query_row(
            "SELECT COALESCE(MAX(ticket_id), 0) FROM issue_events",
            [],
            |row| row.get(0),
        )?)
    }

    /// Appends a news item.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn add_news(&self, mut item: NewsItem) -> Result<NewsItem> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO news (title, description, project_identifier, hostname, published, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?
        .execute(params![
            &item.title,
            &item.description,
            &item.project_identifier,
            &item.hostname,
            item.published,
            item.created_at.timestamp_millis(),
        ])?;
        item.id = conn.last_insert_rowid();
        Ok(item)
    }

    /// Returns up to `limit` news items, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn news(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {NEWS_COLUMNS} FROM news ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![sql_limit(limit)], news_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Returns the stored version record for an application.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn find_version(&self, name: &str) -> Result<Option<VersionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT name, version, version_multi, status, updated_at FROM versions WHERE name = ?1",
        )?;
        Ok(stmt
            .query_row(params![name], |row| {
                Ok(VersionRecord {
                    name: row.get(0)?,
                    version: row.get(1)?,
                    version_multi: row.get(2)?,
                    status: row.get(3)?,
                    updated_at: from_millis(row.get(4)?),
                })
            })
            .optional()?)
    }

    /// Inserts or replaces a version record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save_version(&self, record: &VersionRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO versions (name, version, version_multi, status, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                version = excluded.version,
                version_multi = excluded.version_multi,
                status = excluded.status,
                updated_at = excluded.updated_at",
        )?
        .execute(params![
            &record.name,
            &record.version,
            &record.version_multi,
            &record.status,
            record.updated_at.timestamp_millis(),
        ])?;
        Ok(())
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn alarm_from_row(row: &Row<'_>) -> rusqlite::Result<AlarmEvent> {
    Ok(AlarmEvent {
        id: row.get(0)?,
        project_identifier: row.get(1)?,
        hostname: row.get(2)?,
        content: row.get(3)?,
        status: row.get(4)?,
        service: row.get(5)?,
        module: row.get(6)?,
        created_at: from_millis(row.get(7)?),
    })
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<IssueEvent> {
    Ok(IssueEvent {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        notes: row.get(2)?,
        tracker_id: row.get(3)?,
        description: row.get(4)?,
        subject: row.get(5)?,
        priority_id: row.get(6)?,
        ticket_status_id: row.get(7)?,
        assigned_to_id: row.get(8)?,
        project_identifier: row.get(9)?,
        hostname: row.get(10)?,
        status: row.get(11)?,
        service: row.get(12)?,
        module: row.get(13)?,
        created_at: from_millis(row.get(14)?),
    })
}

fn news_from_row(row: &Row<'_>) -> rusqlite::Result<NewsItem> {
    Ok(NewsItem {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        project_identifier: row.get(3)?,
        hostname: row.get(4)?,
        published: row.get(5)?,
        created_at: from_millis(row.get(6)?),
    })
}

impl HistoryStore for SqliteHistory {
    fn last_alarms(&self, key: &TupleKey, limit: usize) -> mono_alerts::Result<Vec<AlarmEvent>> {
        Ok(self.alarms(key, limit)?)
    }

    fn insert_alarm(&self, event: AlarmEvent) -> mono_alerts::Result<AlarmEvent> {
        Ok(self.add_alarm(event)?)
    }

    fn last_issues(&self, key: &TupleKey, limit: usize) -> mono_alerts::Result<Vec<IssueEvent>> {
        Ok(self.issues(key, limit)?)
    }

    fn recent_issue(
        &self,
        key: &TupleKey,
        since: DateTime<Utc>,
    ) -> mono_alerts::Result<Option<IssueEvent>> {
        Ok(self.recent_ticket(key, since)?)
    }

    fn insert_issue(&self, event: IssueEvent) -> mono_alerts::Result<IssueEvent> {
        Ok(self.add_issue(event)?)
    }

    fn max_ticket_id(&self) -> mono_alerts::Result<i64> {
        Ok(self.highest_ticket_id()?)
    }

    fn insert_news(&self, item: NewsItem) -> mono_alerts::Result<NewsItem> {
        Ok(self.add_news(item)?)
    }

    fn recent_news(&self, limit: usize) -> mono_alerts::Result<Vec<NewsItem>> {
        Ok(self.news(limit)?)
    }
}

impl VersionStore for SqliteHistory {
    fn version(&self, name: &str) -> mono_alerts::Result<Option<VersionRecord>> {
        self.find_version(name).map_err(AlertError::from)
    }

    fn upsert_version(&self, record: VersionRecord) -> mono_alerts::Result<()> {
        self.save_version(&record).map_err(AlertError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use mono_alerts::{Identity, IssueDraft, STATUS_DOWN, STATUS_UP};
    use tempfile::TempDir;

    fn identity() -> Identity {
        Identity::new("proj1", "host1")
    }

    fn alarm(module: &str, status: &str, at: DateTime<Utc>) -> AlarmEvent {
        AlarmEvent::new(&identity().key("diskProbe", module), "[disk] 92%", status, at)
    }

    fn issue(status: &str, ticket_id: i64, at: DateTime<Utc>) -> IssueEvent {
        let mut event = IssueDraft::builder("disk /var is full", status)
            .service("diskProbe")
            .module("/var")
            .notes("still full")
            .assigned_to("7")
            .build()
            .into_event(&identity(), at);
        event.ticket_id = ticket_id;
        event
    }

    fn millis(at: DateTime<Utc>) -> DateTime<Utc> {
        from_millis(at.timestamp_millis())
    }

    mod open_tests {
        use super::*;

        #[test]
        fn creates_parent_directory() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("nested/state/monokit.db");

            let store = SqliteHistory::open(&path).unwrap();
            assert!(path.exists());
            assert_eq!(store.path(), Some(path.as_path()));
        }

        #[test]
        fn uses_wal_journal() {
            let dir = TempDir::new().unwrap();
            let store = SqliteHistory::open(dir.path().join("monokit.db")).unwrap();
            let mode: String = store
                .conn
                .lock()
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap();
            assert_eq!(mode.to_lowercase(), "wal");
        }

        #[test]
        fn state_survives_reopen() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("monokit.db");
            let key = identity().key("diskProbe", "/var");

            {
                let store = SqliteHistory::open(&path).unwrap();
                store.add_alarm(alarm("/var", STATUS_DOWN, Utc::now())).unwrap();
                store.add_issue(issue(STATUS_DOWN, 42, Utc::now())).unwrap();
            }

            let store = SqliteHistory::open(&path).unwrap();
            assert_eq!(store.alarms(&key, 10).unwrap().len(), 1);
            assert_eq!(store.issues(&key, 10).unwrap()[0].ticket_id, 42);
            assert_eq!(store.highest_ticket_id().unwrap(), 42);
        }

        #[test]
        fn two_handles_share_one_file() {
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("monokit.db");
            let first = SqliteHistory::open(&path).unwrap();
            let second = SqliteHistory::open(&path).unwrap();

            first.add_alarm(alarm("/var", STATUS_DOWN, Utc::now())).unwrap();
            second.add_alarm(alarm("/var", STATUS_UP, Utc::now())).unwrap();

            let key = identity().key("diskProbe", "/var");
            let rows = first.alarms(&key, 10).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].status, STATUS_UP);
        }
    }

    mod alarm_tests {
        use super::*;

        #[test]
        fn roundtrip_preserves_fields() {
            let store = SqliteHistory::open_in_memory().unwrap();
            let now = Utc::now();
            let stored = store.add_alarm(alarm("/var", STATUS_DOWN, now)).unwrap();

            let key = identity().key("diskProbe", "/var");
            let loaded = store.last_alarm(&key).unwrap().unwrap();
            assert_eq!(loaded.id, stored.id);
            assert_eq!(loaded.content, "[disk] 92%");
            assert_eq!(loaded.created_at, millis(now));
        }

        #[test]
        fn window_is_newest_first_and_scoped() {
            let store = SqliteHistory::open_in_memory().unwrap();
            let now = Utc::now();
            store.add_alarm(alarm("/var", STATUS_DOWN, now)).unwrap();
            store.add_alarm(alarm("/home", STATUS_DOWN, now)).unwrap();
            store.add_alarm(alarm("/var", STATUS_UP, now)).unwrap();
            store.add_alarm(alarm("/var", STATUS_DOWN, now)).unwrap();

            let key = identity().key("diskProbe", "/var");
            let window = store.last_alarms(&key, 2).unwrap();
            assert_eq!(window.len(), 2);
            assert_eq!(window[0].status, STATUS_DOWN);
            assert_eq!(window[1].status, STATUS_UP);
            assert_eq!(store.last_alarm(&key).unwrap().as_ref(), window.first());
        }

        #[test]
        fn empty_service_and_module_are_a_tuple() {
            let store = SqliteHistory::open_in_memory().unwrap();
            let key = identity().key("", "");
            store
                .add_alarm(AlarmEvent::new(&key, "host reboot", STATUS_DOWN, Utc::now()))
                .unwrap();
            assert_eq!(store.alarms(&key, 5).unwrap().len(), 1);
            assert!(store.alarms(&identity().key("diskProbe", ""), 5).unwrap().is_empty());
        }
    }

    mod issue_tests {
        use super::*;

        #[test]
        fn roundtrip_preserves_fields() {
            let store = SqliteHistory::open_in_memory().unwrap();
            let now = Utc::now();
            let stored = store.add_issue(issue(STATUS_DOWN, 42, now)).unwrap();

            let key = identity().key("diskProbe", "/var");
            let loaded = store.last_issue(&key).unwrap().unwrap();
            assert_eq!(loaded, IssueEvent {
                created_at: millis(now),
                ..stored
            });
            assert_eq!(loaded.assigned_to_id, "7");
            assert_eq!(loaded.notes, "still full");
        }

        #[test]
        fn recent_ticket_filters() {
            let store = SqliteHistory::open_in_memory().unwrap();
            let now = Utc::now();
            let key = identity().key("diskProbe", "/var");
            let since = now - TimeDelta::hours(6);

            store.add_issue(issue(STATUS_DOWN, 0, now)).unwrap();
            assert!(store.recent_ticket(&key, since).unwrap().is_none());

            store
                .add_issue(issue(STATUS_DOWN, 9, now - TimeDelta::hours(8)))
                .unwrap();
            assert!(store.recent_ticket(&key, since).unwrap().is_none());

            store
                .add_issue(issue(STATUS_UP, 9, now - TimeDelta::hours(1)))
                .unwrap();
            let found = store.recent_ticket(&key, since).unwrap().unwrap();
            assert_eq!(found.ticket_id, 9);
            assert_eq!(found.status, STATUS_UP);
        }

        #[test]
        fn highest_ticket_id_empty_is_zero() {
            let store = SqliteHistory::open_in_memory().unwrap();
            assert_eq!(store.max_ticket_id().unwrap(), 0);
        }
    }

    mod news_tests {
        use super::*;

        #[test]
        fn news_newest_first() {
            let store = SqliteHistory::open_in_memory().unwrap();
            let mut item = NewsItem::new(&identity(), "Docker updated", "28 to 29", Utc::now());
            store.insert_news(item.clone()).unwrap();
            item.title = "nginx updated".to_string();
            item.published = true;
            store.insert_news(item).unwrap();

            let news = store.recent_news(10).unwrap();
            assert_eq!(news.len(), 2);
            assert_eq!(news[0].title, "nginx updated");
            assert!(news[0].published);
            assert!(!news[1].published);
        }

        #[test]
        fn version_upsert() {
            let store = SqliteHistory::open_in_memory().unwrap();
            assert!(store.version("Docker").unwrap().is_none());

            let record = VersionRecord {
                name: "Docker".to_string(),
                version: "28.5.2".to_string(),
                version_multi: r#"{"engine":"28.5.2"}"#.to_string(),
                status: "installed".to_string(),
                updated_at: millis(Utc::now()),
            };
            store.upsert_version(record.clone()).unwrap();
            store
                .upsert_version(VersionRecord {
                    version: "29.0.0".to_string(),
                    ..record.clone()
                })
                .unwrap();

            let loaded = store.version("Docker").unwrap().unwrap();
            assert_eq!(loaded.version, "29.0.0");
            assert_eq!(loaded.version_multi, record.version_multi);
        }
    }
}
