//! CLI error types.

use std::fmt;

use mono_alerts::AlertError;
use mono_config::ConfigError;
use mono_store::StorageError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// The configuration could not be loaded.
    Config(ConfigError),
    /// The engine or the history store failed.
    Engine(AlertError),
    /// Logging could not be set up.
    Logging(String),
    /// Output formatting error.
    Format(String),
    /// Invalid argument.
    InvalidArgument(String),
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Returns true if the error should fail the process.
    ///
    /// Delivery and remote-call failures are retried by the next probe run,
    /// so they only produce a warning.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_fatal(),
            _ => true,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Engine(e) => write!(f, "{e}"),
            Self::Logging(msg) => write!(f, "logging error: {msg}"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Engine(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<AlertError> for CliError {
    fn from(err: AlertError) -> Self {
        Self::Engine(err)
    }
}

impl From<StorageError> for CliError {
    fn from(err: StorageError) -> Self {
        Self::Engine(err.into())
    }
}
