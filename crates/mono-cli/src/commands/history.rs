//! `monokit history`.

use std::io::Write;

use mono_alerts::HistoryStore;

use crate::app::App;
use crate::cli::{HistoryCommands, TupleArgs};
use crate::error::CliError;
use crate::output::{AlarmList, IssueList, NewsList, OutputFormat};

/// Reads recorded history for this project and host.
#[derive(Debug)]
pub struct HistoryCommand<'a> {
    app: &'a App,
}

impl<'a> HistoryCommand<'a> {
    /// Create a new history command handler.
    #[must_use]
    pub const fn new(app: &'a App) -> Self {
        Self { app }
    }

    /// Execute a history subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be read.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &HistoryCommands,
    ) -> Result<(), CliError> {
        let store = self.app.store();
        match command {
            HistoryCommands::Alarms { tuple, limit } => {
                let alarms = store.last_alarms(&self.key(tuple), *limit)?;
                format.write(out, &AlarmList { alarms })
            }
            HistoryCommands::Issues { tuple, limit } => {
                let issues = store.last_issues(&self.key(tuple), *limit)?;
                format.write(out, &IssueList { issues })
            }
            HistoryCommands::News { limit } => {
                let news = store.recent_news(*limit)?;
                format.write(out, &NewsList { news })
            }
        }
    }

    fn key(&self, tuple: &TupleArgs) -> mono_alerts::TupleKey {
        mono_alerts::Identity::from(self.app.config()).key(&tuple.service, &tuple.module)
    }
}
