//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mono_config::DEFAULT_CONFIG_PATH;

/// Monokit - alert deduplication and issue escalation for host probes.
#[derive(Parser, Debug, Clone)]
#[command(name = "monokit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the global configuration file.
    #[arg(short, long, env = "MONOKIT_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Send a chat alarm unless it is a duplicate.
    Alarm(AlarmArgs),

    /// Ticket commands.
    Issue {
        /// Issue subcommand to execute.
        #[command(subcommand)]
        command: IssueCommands,
    },

    /// Record and publish a news item.
    News(NewsArgs),

    /// Report an application's current version; announces changes.
    Version(VersionArgs),

    /// Show recorded history.
    History {
        /// History subcommand to execute.
        #[command(subcommand)]
        command: HistoryCommands,
    },
}

/// Probe and sub-check a command applies to.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TupleArgs {
    /// Probe name.
    #[arg(short, long, default_value = "")]
    pub service: String,

    /// Sub-check name.
    #[arg(short, long, default_value = "")]
    pub module: String,
}

/// Arguments for `monokit alarm`.
#[derive(Args, Debug, Clone)]
pub struct AlarmArgs {
    /// Probe and sub-check.
    #[command(flatten)]
    pub tuple: TupleArgs,

    /// Logical status, usually `up` or `down`.
    #[arg(long)]
    pub status: String,

    /// Message text.
    #[arg(required = true)]
    pub message: String,
}

/// Issue subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum IssueCommands {
    /// Create, update or reopen a ticket for a condition.
    Escalate(EscalateArgs),

    /// Show a ticket from Redmine.
    Show {
        /// Ticket id.
        id: i64,
    },
}

/// Arguments for `monokit issue escalate`.
#[derive(Args, Debug, Clone)]
pub struct EscalateArgs {
    /// Probe and sub-check.
    #[command(flatten)]
    pub tuple: TupleArgs,

    /// Logical status, usually `up` or `down`.
    #[arg(long)]
    pub status: String,

    /// Ticket title.
    #[arg(long)]
    pub subject: String,

    /// Ticket body.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Journal notes used when the ticket is updated.
    #[arg(long, default_value = "")]
    pub notes: String,

    /// Redmine tracker id.
    #[arg(long)]
    pub tracker: Option<i64>,

    /// Redmine priority id (1 urgent .. 5 default).
    #[arg(long)]
    pub priority: Option<i64>,

    /// Redmine workflow status id to create or update with. Defaults to
    /// Resolved (3) for `up` and Feedback (8) otherwise.
    #[arg(long)]
    pub ticket_status: Option<i64>,

    /// Assignee id.
    #[arg(long)]
    pub assigned_to: Option<String>,
}

/// Arguments for `monokit news`.
#[derive(Args, Debug, Clone)]
pub struct NewsArgs {
    /// Headline.
    #[arg(long)]
    pub title: String,

    /// Body.
    #[arg(long)]
    pub description: String,
}

/// Arguments for `monokit version`.
#[derive(Args, Debug, Clone)]
pub struct VersionArgs {
    /// Application name, e.g. `Docker`.
    pub application: String,

    /// Version currently installed.
    pub version: String,
}

/// History subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommands {
    /// Alarms sent for a probe and sub-check.
    Alarms {
        /// Probe and sub-check.
        #[command(flatten)]
        tuple: TupleArgs,

        /// Maximum rows to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Ticket states recorded for a probe and sub-check.
    Issues {
        /// Probe and sub-check.
        #[command(flatten)]
        tuple: TupleArgs,

        /// Maximum rows to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Recorded news items.
    News {
        /// Maximum rows to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}
