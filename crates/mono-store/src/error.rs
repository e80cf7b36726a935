//! Error types for the history store.

use mono_alerts::AlertError;
use thiserror::Error;

/// Errors that can occur in the history store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database directory could not be created.
    #[error("cannot create database directory '{path}': {source}")]
    CreateDir {
        /// Directory that was being created.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// SQLite refused to switch to write-ahead logging.
    #[error("journal mode is '{0}', expected 'wal'")]
    JournalMode(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl From<StorageError> for AlertError {
    fn from(err: StorageError) -> Self {
        Self::QueryFailed {
            reason: err.to_string(),
        }
    }
}
