//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use chrono::{DateTime, Utc};
use mono_alerts::{
    AlarmEvent, EscalateOutcome, IssueEvent, NewsItem, NotifyOutcome, RemoteIssue,
    SuppressReason, VersionChange,
};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Get the current format.
    #[must_use]
    pub const fn format(&self) -> Format {
        self.format
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }

    /// Write a serializable value to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TableDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// Result of `monokit alarm`.
#[derive(Debug, Clone, Serialize)]
pub struct NotifyReport {
    /// `sent` or `suppressed`.
    pub outcome: &'static str,
    /// Why nothing was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SuppressReason>,
    /// The recorded alarm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm: Option<AlarmEvent>,
}

impl From<NotifyOutcome> for NotifyReport {
    fn from(outcome: NotifyOutcome) -> Self {
        let label = outcome.label();
        match outcome {
            NotifyOutcome::Sent(alarm) => Self {
                outcome: label,
                reason: None,
                alarm: Some(alarm),
            },
            NotifyOutcome::Suppressed(reason) => Self {
                outcome: label,
                reason: Some(reason),
                alarm: None,
            },
        }
    }
}

impl TableDisplay for NotifyReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match (&self.alarm, self.reason) {
            (Some(alarm), _) => writeln!(
                writer,
                "Alarm {}: {} {} ({})",
                alarm.id,
                tuple_label(&alarm.service, &alarm.module),
                alarm.status,
                self.outcome
            )?,
            (None, Some(reason)) => writeln!(writer, "Alarm {}: {reason}", self.outcome)?,
            (None, None) => writeln!(writer, "Alarm {}", self.outcome)?,
        }
        Ok(())
    }
}

/// Result of `monokit issue escalate`.
#[derive(Debug, Clone, Serialize)]
pub struct EscalateReport {
    /// `created`, `updated`, `reopened`, `no-op` or `suppressed`.
    pub outcome: &'static str,
    /// Why nothing was done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SuppressReason>,
    /// The row the outcome refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<IssueEvent>,
}

impl From<EscalateOutcome> for EscalateReport {
    fn from(outcome: EscalateOutcome) -> Self {
        let reason = match outcome {
            EscalateOutcome::Suppressed(reason) => Some(reason),
            _ => None,
        };
        Self {
            outcome: outcome.label(),
            reason,
            issue: outcome.event().cloned(),
        }
    }
}

impl TableDisplay for EscalateReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let Some(issue) = &self.issue else {
            match self.reason {
                Some(reason) => writeln!(writer, "Issue {}: {reason}", self.outcome)?,
                None => writeln!(writer, "Issue {}", self.outcome)?,
            }
            return Ok(());
        };

        writeln!(writer, "Issue #{} {}", issue.ticket_id, self.outcome)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Subject:   {}", issue.subject)?;
        writeln!(writer, "Check:     {}", tuple_label(&issue.service, &issue.module))?;
        writeln!(writer, "Status:    {}", issue.status)?;
        writeln!(writer, "Workflow:  {}", issue.ticket_status_id)?;
        writeln!(writer, "Priority:  {}", issue.priority_id)?;
        Ok(())
    }
}

/// A ticket read from Redmine.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct IssueReport(pub RemoteIssue);

impl TableDisplay for IssueReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let issue = &self.0;
        let name = |r: &Option<mono_alerts::tickets::NamedRef>| {
            r.as_ref().map_or_else(|| "-".to_string(), |r| r.name.clone())
        };

        writeln!(writer, "Issue #{}", issue.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Subject:   {}", issue.subject)?;
        writeln!(writer, "Project:   {}", name(&issue.project))?;
        writeln!(writer, "Tracker:   {}", name(&issue.tracker))?;
        writeln!(writer, "Status:    {}", name(&issue.status))?;
        writeln!(writer, "Priority:  {}", name(&issue.priority))?;
        writeln!(writer, "Assignee:  {}", name(&issue.assigned_to))?;
        if let Some(updated) = &issue.updated_on {
            writeln!(writer, "Updated:   {updated}")?;
        }
        if !issue.description.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "{}", issue.description)?;
        }
        Ok(())
    }
}

/// Result of `monokit news`.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct NewsReport(pub NewsItem);

impl TableDisplay for NewsReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        let item = &self.0;
        let state = if item.published { "published" } else { "recorded only" };
        writeln!(writer, "News {}: {} ({state})", item.id, item.title)?;
        Ok(())
    }
}

/// Result of `monokit version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionReport {
    /// Application name.
    pub application: String,
    /// What changed.
    #[serde(flatten)]
    pub change: VersionChange,
}

impl TableDisplay for VersionReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.change {
            VersionChange::FirstSeen { version } => {
                writeln!(writer, "{} {version} recorded", self.application)?;
            }
            VersionChange::Unchanged { version } => {
                writeln!(writer, "{} {version} unchanged", self.application)?;
            }
            VersionChange::Changed { previous, news } => {
                writeln!(writer, "{} changed from {previous}", self.application)?;
                writeln!(writer, "News {}: {}", news.id, news.title)?;
            }
        }
        Ok(())
    }
}

/// Alarms for one tuple, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct AlarmList {
    /// Recorded alarms.
    pub alarms: Vec<AlarmEvent>,
}

impl TableDisplay for AlarmList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.alarms.is_empty() {
            writeln!(writer, "No alarms recorded")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>6}  {:<19}  {:<6}  {:<24}  {:<40}",
            "ID", "CREATED", "STATUS", "CHECK", "MESSAGE"
        )?;
        writeln!(writer, "{}", "─".repeat(103))?;

        for alarm in &self.alarms {
            writeln!(
                writer,
                "{:>6}  {:<19}  {:<6}  {:<24}  {:<40}",
                alarm.id,
                timestamp(alarm.created_at),
                alarm.status,
                truncate(&tuple_label(&alarm.service, &alarm.module), 24),
                truncate(&alarm.content, 40)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} alarm(s)", self.alarms.len())?;
        Ok(())
    }
}

/// Ticket rows for one tuple, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct IssueList {
    /// Recorded ticket states.
    pub issues: Vec<IssueEvent>,
}

impl TableDisplay for IssueList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.issues.is_empty() {
            writeln!(writer, "No issues recorded")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>6}  {:>8}  {:<19}  {:<6}  {:>8}  {:<32}",
            "ID", "TICKET", "CREATED", "STATUS", "WORKFLOW", "SUBJECT"
        )?;
        writeln!(writer, "{}", "─".repeat(88))?;

        for issue in &self.issues {
            writeln!(
                writer,
                "{:>6}  {:>8}  {:<19}  {:<6}  {:>8}  {:<32}",
                issue.id,
                issue.ticket_id,
                timestamp(issue.created_at),
                issue.status,
                issue.ticket_status_id,
                truncate(&issue.subject, 32)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} issue row(s)", self.issues.len())?;
        Ok(())
    }
}

/// Recorded news, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct NewsList {
    /// News items.
    pub news: Vec<NewsItem>,
}

impl TableDisplay for NewsList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.news.is_empty() {
            writeln!(writer, "No news recorded")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:>6}  {:<19}  {:<9}  {:<48}",
            "ID", "CREATED", "PUBLISHED", "TITLE"
        )?;
        writeln!(writer, "{}", "─".repeat(88))?;

        for item in &self.news {
            writeln!(
                writer,
                "{:>6}  {:<19}  {:<9}  {:<48}",
                item.id,
                timestamp(item.created_at),
                if item.published { "yes" } else { "no" },
                truncate(&item.title, 48)
            )?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} item(s)", self.news.len())?;
        Ok(())
    }
}

fn tuple_label(service: &str, module: &str) -> String {
    match (service.is_empty(), module.is_empty()) {
        (true, true) => "-".to_string(),
        (false, true) => service.to_string(),
        (true, false) => module.to_string(),
        (false, false) => format!("{service}/{module}"),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncate a string to a maximum number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
