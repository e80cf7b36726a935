//! Command handlers.
//!
//! Each handler borrows the [`App`](crate::app::App) for one run and writes
//! its result through an [`OutputFormat`](crate::output::OutputFormat).

mod alarm;
mod history;
mod issue;
mod news;
mod version;

pub use alarm::AlarmCommand;
pub use history::HistoryCommand;
pub use issue::IssueCommand;
pub use news::NewsCommand;
pub use version::VersionCommand;

use crate::error::CliError;

/// Rejects blank values for arguments the engine keys history on.
pub(crate) fn require(name: &str, value: &str) -> Result<(), CliError> {
    if value.trim().is_empty() {
        return Err(CliError::InvalidArgument(format!("{name} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use mono_config::{AlarmConfig, GlobalConfig, RedmineConfig};
    use mono_store::SqliteHistory;

    use crate::app::App;
    use crate::cli::Format;
    use crate::output::OutputFormat;

    /// Test-mode app over an in-memory database with both backends enabled.
    pub fn app() -> App {
        let config = GlobalConfig {
            project_identifier: "proj1".into(),
            hostname: "host1".into(),
            sqlite_location: ":memory:".into(),
            alarm: AlarmConfig {
                enabled: true,
                limit: 2,
                webhook_urls: vec!["http://127.0.0.1:9/hook".into()],
                ..AlarmConfig::default()
            },
            redmine: RedmineConfig {
                enabled: true,
                ..RedmineConfig::default()
            },
            ..GlobalConfig::default()
        };
        App::with_store(config, true, SqliteHistory::open_in_memory().unwrap())
    }

    pub fn json() -> OutputFormat {
        OutputFormat::new(Format::Json)
    }

    pub fn run<F>(f: F) -> serde_json::Value
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), crate::error::CliError>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        serde_json::from_slice(&out).unwrap()
    }
}
