//! `monokit issue`.

use std::io::Write;

use mono_alerts::{IssueDraft, TicketBackend};

use crate::app::App;
use crate::cli::{EscalateArgs, IssueCommands};
use crate::commands::require;
use crate::error::CliError;
use crate::output::{EscalateReport, IssueReport, OutputFormat};

/// Issue command handler.
#[derive(Debug)]
pub struct IssueCommand<'a> {
    app: &'a App,
}

impl<'a> IssueCommand<'a> {
    /// Create a new issue command handler.
    #[must_use]
    pub const fn new(app: &'a App) -> Self {
        Self { app }
    }

    /// Execute an issue subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the escalation or the Redmine read fails.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &IssueCommands,
    ) -> Result<(), CliError> {
        match command {
            IssueCommands::Escalate(args) => self.escalate(out, format, args),
            IssueCommands::Show { id } => self.show(out, format, *id),
        }
    }

    fn escalate<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &EscalateArgs,
    ) -> Result<(), CliError> {
        require("status", &args.status)?;
        require("subject", &args.subject)?;

        let outcome = self.app.escalator()?.escalate(draft(args))?;
        format.write(out, &EscalateReport::from(outcome))
    }

    fn show<W: Write>(&self, out: &mut W, format: &OutputFormat, id: i64) -> Result<(), CliError> {
        if id <= 0 {
            return Err(CliError::InvalidArgument(format!("invalid ticket id {id}")));
        }
        if self.app.test_mode() {
            return Err(CliError::InvalidArgument(
                "issue show reads from Redmine and is unavailable in test mode".to_string(),
            ));
        }

        let issue = self.app.redmine()?.get_issue(id)?;
        format.write(out, &IssueReport(issue))
    }
}

fn draft(args: &EscalateArgs) -> IssueDraft {
    let mut builder = IssueDraft::builder(args.subject.trim(), args.status.trim())
        .service(&args.tuple.service)
        .module(&args.tuple.module)
        .description(&args.description)
        .notes(&args.notes);

    if let Some(tracker) = args.tracker {
        builder = builder.tracker(tracker);
    }
    if let Some(priority) = args.priority {
        builder = builder.priority(priority);
    }
    if let Some(status) = args.ticket_status {
        builder = builder.ticket_status(status);
    }
    if let Some(assignee) = &args.assigned_to {
        builder = builder.assigned_to(assignee);
    }
    builder.build()
}
