//! # mono-cli
//!
//! The `monokit` command-line interface.
//!
//! Probes and operators call into the alert engine through one-shot
//! commands, each of which is a fresh process:
//!
//! - `alarm`: send a chat alarm unless it duplicates recent ones
//! - `issue escalate`: open, update or reopen a Redmine ticket
//! - `issue show`: read a ticket from Redmine
//! - `news` and `version`: record and publish announcements
//! - `history`: inspect what the engine has recorded
//!
//! Commands exit non-zero only for fatal errors (configuration, storage,
//! credentials). Delivery failures are logged and retried by the next run.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod app;
pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;

pub use app::App;
pub use cli::{Cli, Commands, Format, HistoryCommands, IssueCommands};
pub use error::CliError;
pub use output::OutputFormat;
