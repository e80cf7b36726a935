//! `monokit version`.

use std::io::Write;

use crate::app::App;
use crate::cli::VersionArgs;
use crate::commands::require;
use crate::error::CliError;
use crate::output::{OutputFormat, VersionReport};

/// Compares an application's version with the last one seen.
#[derive(Debug)]
pub struct VersionCommand<'a> {
    app: &'a App,
}

impl<'a> VersionCommand<'a> {
    /// Create a new version command handler.
    #[must_use]
    pub const fn new(app: &'a App) -> Self {
        Self { app }
    }

    /// Execute the version command.
    ///
    /// # Errors
    ///
    /// Returns an error if the version or news tables are unavailable.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &VersionArgs,
    ) -> Result<(), CliError> {
        require("application", &args.application)?;
        require("version", &args.version)?;

        let change = self
            .app
            .broadcaster()?
            .observe_version(&args.application, args.version.trim())?;
        format.write(
            out,
            &VersionReport {
                application: args.application.clone(),
                change,
            },
        )
    }
}
