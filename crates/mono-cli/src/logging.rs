//! Tracing setup driven by `log-location`.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use mono_config::GlobalConfig;
use tracing_subscriber::EnvFilter;

use crate::error::CliError;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Installs the global subscriber.
///
/// `stdout` (or an empty location) logs human-readable lines to stderr so
/// command output on stdout stays parseable. Any other location is a file
/// that receives JSON lines, created along with its parent directory.
///
/// # Errors
///
/// Returns `CliError::Logging` if the log file cannot be opened or a
/// subscriber is already installed.
pub fn init(config: &GlobalConfig) -> Result<(), CliError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = if config.logs_to_stdout() {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
    } else {
        let file = open_log_file(Path::new(config.log_location.trim()))?;
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    };

    result.map_err(|e| CliError::Logging(e.to_string()))
}

fn open_log_file(path: &Path) -> Result<File, CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CliError::Logging(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CliError::Logging(format!("cannot open {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_and_parent_are_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("monokit.log");

        open_log_file(&path).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn log_file_is_appended() {
        use std::io::Write;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monokit.log");
        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn unwritable_location_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let err = open_log_file(&blocker.join("monokit.log")).unwrap_err();
        assert!(matches!(err, CliError::Logging(_)));
    }
}
