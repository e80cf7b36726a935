//! # mono-store
//!
//! SQLite history for the monokit alert engine.
//!
//! Every probe run is a separate process, so all engine state lives in one
//! SQLite file shared by concurrent processes:
//!
//! - `alarm_events`: chat notifications that were sent
//! - `issue_events`: known ticket states per tuple
//! - `news`: version-change announcements
//! - `versions`: last known version per application
//!
//! ## Example
//!
//! ```rust
//! use mono_alerts::{AlarmEvent, HistoryStore, Identity};
//! use mono_store::SqliteHistory;
//! use chrono::Utc;
//!
//! let store = SqliteHistory::open_in_memory().unwrap();
//! let key = Identity::new("proj1", "host1").key("diskProbe", "/var");
//!
//! store.insert_alarm(AlarmEvent::new(&key, "[disk] 92%", "down", Utc::now())).unwrap();
//! assert_eq!(store.last_alarm(&key).unwrap().unwrap().status, "down");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
mod schema;
pub mod sqlite;

pub use error::{Result, StorageError};
pub use sqlite::{BUSY_TIMEOUT, SqliteHistory};
