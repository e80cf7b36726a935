//! `monokit news`.

use std::io::Write;

use crate::app::App;
use crate::cli::NewsArgs;
use crate::commands::require;
use crate::error::CliError;
use crate::output::{NewsReport, OutputFormat};

/// Records a news item and publishes it when Redmine is reachable.
#[derive(Debug)]
pub struct NewsCommand<'a> {
    app: &'a App,
}

impl<'a> NewsCommand<'a> {
    /// Create a new news command handler.
    #[must_use]
    pub const fn new(app: &'a App) -> Self {
        Self { app }
    }

    /// Execute the news command.
    ///
    /// # Errors
    ///
    /// Returns an error if the item cannot be recorded.
    pub fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        args: &NewsArgs,
    ) -> Result<(), CliError> {
        require("title", &args.title)?;

        let item = self
            .app
            .broadcaster()?
            .announce(&args.title, &args.description)?;
        format.write(out, &NewsReport(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_mode_records_unpublished() {
        let app = fixtures::app();
        let args = NewsArgs {
            title: "nginx updated".into(),
            description: "1.24 to 1.26".into(),
        };

        let value = fixtures::run(|out| NewsCommand::new(&app).execute(out, &fixtures::json(), &args));

        assert_eq!(value["title"], "nginx updated");
        assert_eq!(value["published"], false);
        assert_eq!(value["project_identifier"], "proj1");
    }
}
