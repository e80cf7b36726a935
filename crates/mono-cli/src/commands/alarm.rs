//! `monokit alarm`.

use std::io::Write;

use crate::app::App;
use crate::cli::AlarmArgs;
use crate::commands::require;
use crate::error::CliError;
use crate::output::{NotifyReport, OutputFormat};

/// Sends a chat alarm through the dispatcher.
#[derive(Debug)]
pub struct AlarmCommand<'a> {
    app: &'a App,
}

impl<'a> AlarmCommand<'a> {
    /// Create a new alarm command handler.
    #[must_use]
    pub const fn new(app: &'a App) -> Self {
        Self { app }
    }

    /// Execute the alarm command.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery or history access fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &AlarmArgs,
    ) -> Result<(), CliError> {
        require("status", &args.status)?;

        let outcome = self.app.dispatcher()?.notify(
            &args.message,
            &args.tuple.service,
            &args.tuple.module,
            args.status.trim(),
        )?;
        format.write(out, &NotifyReport::from(outcome))
    }
}
