//! Version-change announcements.
//!
//! Every announcement is recorded locally. Outside test mode it is also
//! published to the project's Redmine news feed first; a failed publish is
//! logged and the item is kept with `published = false`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mono_config::GlobalConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::history::{HistoryStore, VersionStore};
use crate::tickets::{NewsPost, TicketBackend};
use crate::types::{Identity, NewsItem, VersionRecord};

/// Status stored for applications found on the host.
pub const VERSION_INSTALLED: &str = "installed";

/// Settings for [`NewsBroadcaster`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsConfig {
    /// Project and host stamped on every item.
    pub identity: Identity,
    /// Whether items are published to Redmine.
    pub enabled: bool,
    /// Skip the network while keeping persistence.
    pub test_mode: bool,
}

impl NewsConfig {
    /// Builds the broadcaster settings from the global configuration.
    #[must_use]
    pub fn from_global(config: &GlobalConfig, test_mode: bool) -> Self {
        Self {
            identity: Identity::from(config),
            enabled: config.redmine.enabled,
            test_mode,
        }
    }
}

/// What [`NewsBroadcaster::observe_version`] found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum VersionChange {
    /// The application had no stored version; it was recorded silently.
    FirstSeen {
        /// Recorded version.
        version: String,
    },
    /// The stored version matches.
    Unchanged {
        /// Current version.
        version: String,
    },
    /// The version moved and an announcement was made.
    Changed {
        /// Version stored before.
        previous: String,
        /// Announcement that was recorded.
        news: NewsItem,
    },
}

/// Records and publishes version-change news.
pub struct NewsBroadcaster {
    config: NewsConfig,
    store: Arc<dyn HistoryStore>,
    versions: Arc<dyn VersionStore>,
    backend: Option<Box<dyn TicketBackend>>,
}

impl fmt::Debug for NewsBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewsBroadcaster")
            .field("config", &self.config)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl NewsBroadcaster {
    /// Creates a broadcaster.
    #[must_use]
    pub fn new(
        config: NewsConfig,
        store: Arc<dyn HistoryStore>,
        versions: Arc<dyn VersionStore>,
        backend: Option<Box<dyn TicketBackend>>,
    ) -> Self {
        Self {
            config,
            store,
            versions,
            backend,
        }
    }

    /// Records a news item, publishing it to Redmine when possible.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::QueryFailed` if the item cannot be recorded.
    /// Publishing failures are logged, not returned.
    pub fn announce(&self, title: &str, description: &str) -> Result<NewsItem> {
        self.announce_at(title, description, Utc::now())
    }

    /// Same as [`announce`](Self::announce) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`announce`](Self::announce).
    pub fn announce_at(
        &self,
        title: &str,
        description: &str,
        now: DateTime<Utc>,
    ) -> Result<NewsItem> {
        let mut item = NewsItem::new(&self.config.identity, title, description, now);
        item.published = self.publish(&item);

        let stored = self.store.insert_news(item)?;
        info!(
            project = %stored.project_identifier,
            host = %stored.hostname,
            title = %stored.title,
            published = stored.published,
            "news recorded"
        );
        Ok(stored)
    }

    fn publish(&self, item: &NewsItem) -> bool {
        if self.config.test_mode {
            debug!(title = %item.title, "test mode, news not published");
            return false;
        }
        if !self.config.enabled {
            return false;
        }
        let Some(backend) = self.backend.as_deref() else {
            warn!(title = %item.title, "redmine credentials missing, news kept locally");
            return false;
        };

        let post = NewsPost {
            title: item.title.clone(),
            description: item.description.clone(),
        };
        match backend.create_news(&item.project_identifier, &post) {
            Ok(()) => true,
            Err(e) => {
                warn!(title = %item.title, error = %e, "news not published");
                false
            }
        }
    }

    /// Compares an application's version with the stored one and announces
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::QueryFailed` if the version or news tables are
    /// unavailable.
    pub fn observe_version(&self, application: &str, version: &str) -> Result<VersionChange> {
        self.observe_version_at(application, version, Utc::now())
    }

    /// Same as [`observe_version`](Self::observe_version) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`observe_version`](Self::observe_version).
    pub fn observe_version_at(
        &self,
        application: &str,
        version: &str,
        now: DateTime<Utc>,
    ) -> Result<VersionChange> {
        let record = VersionRecord {
            name: application.to_string(),
            version: version.to_string(),
            version_multi: String::new(),
            status: VERSION_INSTALLED.to_string(),
            updated_at: now,
        };

        let Some(previous) = self.versions.version(application)? else {
            self.versions.upsert_version(record)?;
            debug!(application, version, "first version recorded");
            return Ok(VersionChange::FirstSeen {
                version: version.to_string(),
            });
        };

        if previous.version == version {
            return Ok(VersionChange::Unchanged {
                version: version.to_string(),
            });
        }

        let host = &self.config.identity.hostname;
        let news = self.announce_at(
            &format!("{application} was updated on {host}"),
            &format!(
                "{application} on {host} was upgraded from {} to {version}.",
                previous.version
            ),
            now,
        )?;
        self.versions.upsert_version(record)?;
        info!(application, previous = %previous.version, version, "version change announced");

        Ok(VersionChange::Changed {
            previous: previous.version,
            news,
        })
    }
}
