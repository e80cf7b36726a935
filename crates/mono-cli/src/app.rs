//! Wires configuration, history and transports into the engine components.

use std::sync::Arc;

use mono_alerts::{
    AlarmDispatcher, DispatcherConfig, EscalatorConfig, IssueEscalator, NewsBroadcaster,
    NewsConfig, RedmineClient, TicketBackend, channel_from_config,
};
use mono_config::GlobalConfig;
use mono_store::SqliteHistory;
use tracing::debug;

use crate::error::CliError;

/// `sqlite-location` value that selects an in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// Everything a command needs for one process run.
#[derive(Debug)]
pub struct App {
    config: GlobalConfig,
    test_mode: bool,
    store: Arc<SqliteHistory>,
}

impl App {
    /// Opens the history database named by `sqlite-location`.
    ///
    /// `:memory:` opens a private database that lives for this run only.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: GlobalConfig, test_mode: bool) -> Result<Self, CliError> {
        let location = config.sqlite_location.trim();
        let store = if location == IN_MEMORY {
            SqliteHistory::open_in_memory()?
        } else {
            SqliteHistory::open(location)?
        };
        Ok(Self::with_store(config, test_mode, store))
    }

    /// Builds an app around an already opened store.
    #[must_use]
    pub fn with_store(config: GlobalConfig, test_mode: bool, store: SqliteHistory) -> Self {
        debug!(
            project = %config.project_identifier,
            host = %config.hostname,
            test_mode,
            "monokit ready"
        );
        Self {
            config,
            test_mode,
            store: Arc::new(store),
        }
    }

    /// Returns the loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Returns true if network calls are skipped.
    #[must_use]
    pub const fn test_mode(&self) -> bool {
        self.test_mode
    }

    /// Returns the history store.
    #[must_use]
    pub fn store(&self) -> &SqliteHistory {
        &self.store
    }

    /// Builds the alarm dispatcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the webhook channel cannot be built.
    pub fn dispatcher(&self) -> Result<AlarmDispatcher, CliError> {
        let channel = channel_from_config(&self.config.alarm)?;
        Ok(AlarmDispatcher::new(
            DispatcherConfig::from_global(&self.config, self.test_mode),
            self.store.clone(),
            channel,
        ))
    }

    /// Builds the issue escalator.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redmine client cannot be built.
    pub fn escalator(&self) -> Result<IssueEscalator, CliError> {
        Ok(IssueEscalator::new(
            EscalatorConfig::from_global(&self.config, self.test_mode),
            self.store.clone(),
            self.backend()?,
        ))
    }

    /// Builds the news broadcaster.
    ///
    /// # Errors
    ///
    /// Returns an error if the Redmine client cannot be built.
    pub fn broadcaster(&self) -> Result<NewsBroadcaster, CliError> {
        Ok(NewsBroadcaster::new(
            NewsConfig::from_global(&self.config, self.test_mode),
            self.store.clone(),
            self.store.clone(),
            self.backend()?,
        ))
    }

    /// Returns a Redmine client for direct reads.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::MisconfiguredCredentials` if the URL or API key
    /// is missing.
    pub fn redmine(&self) -> Result<RedmineClient, CliError> {
        Ok(RedmineClient::from_config(&self.config.redmine)?)
    }

    /// The ticket backend, or `None` when credentials are missing.
    fn backend(&self) -> Result<Option<Box<dyn TicketBackend>>, CliError> {
        if !self.config.redmine.has_credentials() {
            debug!("redmine credentials missing, running without a ticket backend");
            return Ok(None);
        }
        Ok(Some(Box::new(self.redmine()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mono_alerts::{AlertError, NotifyOutcome, SuppressReason};
    use mono_config::{AlarmConfig, RedmineConfig};

    fn config() -> GlobalConfig {
        GlobalConfig {
            project_identifier: "proj1".into(),
            hostname: "host1".into(),
            sqlite_location: ":memory:".into(),
            ..GlobalConfig::default()
        }
    }

    fn app(config: GlobalConfig, test_mode: bool) -> App {
        App::with_store(config, test_mode, SqliteHistory::open_in_memory().unwrap())
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("state").join("monokit.db");
        let mut config = config();
        config.sqlite_location = path.display().to_string();

        let app = App::open(config, true).unwrap();

        assert!(path.exists());
        assert_eq!(app.store().path(), Some(path.as_path()));
    }

    #[test]
    fn open_in_memory_location() {
        let app = App::open(config(), true).unwrap();
        assert!(app.store().path().is_none());
        assert!(app.test_mode());
    }

    #[test]
    fn disabled_alarm_is_suppressed() {
        let app = app(config(), true);
        let outcome = app
            .dispatcher()
            .unwrap()
            .notify("[disk] 92%", "diskProbe", "/var", "down")
            .unwrap();
        assert_eq!(
            outcome,
            NotifyOutcome::Suppressed(SuppressReason::BackendDisabled)
        );
    }

    #[test]
    fn dispatcher_uses_configured_limit() {
        let mut config = config();
        config.alarm = AlarmConfig {
            enabled: true,
            limit: 1,
            webhook_urls: vec!["http://127.0.0.1:9/hook".into()],
            ..AlarmConfig::default()
        };
        let app = app(config, true);
        let dispatcher = app.dispatcher().unwrap();

        let first = dispatcher.notify("msg", "diskProbe", "/var", "down").unwrap();
        let second = dispatcher.notify("msg", "diskProbe", "/var", "down").unwrap();

        assert_eq!(first.label(), "sent");
        assert_eq!(
            second,
            NotifyOutcome::Suppressed(SuppressReason::LimitReached)
        );
    }

    #[test]
    fn redmine_without_credentials_is_misconfigured() {
        let app = app(config(), false);
        let err = app.redmine().unwrap_err();
        assert!(matches!(
            err,
            CliError::Engine(AlertError::MisconfiguredCredentials { .. })
        ));
    }

    #[test]
    fn escalator_builds_with_credentials() {
        let mut config = config();
        config.redmine = RedmineConfig {
            enabled: true,
            url: "https://redmine.example.com/".into(),
            api_key: "secret".into(),
            ..RedmineConfig::default()
        };
        let app = app(config, false);

        assert!(app.escalator().is_ok());
        assert!(app.broadcaster().is_ok());
        assert_eq!(app.redmine().unwrap().base_url(), "https://redmine.example.com");
    }
}
