//! Table definitions, applied on every open.

pub(crate) const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alarm_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_identifier TEXT NOT NULL,
    hostname TEXT NOT NULL,
    content TEXT NOT NULL,
    status TEXT NOT NULL,
    service TEXT NOT NULL DEFAULT '',
    module TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alarm_events_tuple
    ON alarm_events(project_identifier, hostname, service, module, id);

CREATE TABLE IF NOT EXISTS issue_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ticket_id INTEGER NOT NULL DEFAULT 0,
    notes TEXT NOT NULL DEFAULT '',
    tracker_id INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    subject TEXT NOT NULL,
    priority_id INTEGER NOT NULL,
    ticket_status_id INTEGER NOT NULL,
    assigned_to_id TEXT NOT NULL DEFAULT '',
    project_identifier TEXT NOT NULL,
    hostname TEXT NOT NULL,
    status TEXT NOT NULL,
    service TEXT NOT NULL DEFAULT '',
    module TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_issue_events_tuple
    ON issue_events(project_identifier, hostname, service, module, id);

CREATE TABLE IF NOT EXISTS news (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    project_identifier TEXT NOT NULL,
    hostname TEXT NOT NULL,
    published INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS versions (
    name TEXT PRIMARY KEY,
    version TEXT NOT NULL DEFAULT '',
    version_multi TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT '',
    updated_at INTEGER NOT NULL
);
";
