//! Monokit CLI binary entrypoint.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use mono_config::GlobalConfig;
use tracing::{error, warn};

use mono_cli::cli::{Cli, Commands};
use mono_cli::commands::{
    AlarmCommand, HistoryCommand, IssueCommand, NewsCommand, VersionCommand,
};
use mono_cli::output::OutputFormat;
use mono_cli::{App, CliError, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match GlobalConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let test_mode = mono_config::is_test_mode();
    match run(cli, config, test_mode) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_fatal() => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            warn!(error = %e, "command did not complete, next run will retry");
            eprintln!("Warning: {e}");
            ExitCode::SUCCESS
        }
    }
}

fn run(cli: Cli, config: GlobalConfig, test_mode: bool) -> Result<(), CliError> {
    let app = App::open(config, test_mode)?;
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Commands::Alarm(args) => {
            AlarmCommand::new(&app).execute(&mut stdout, &format, args)?;
        }
        Commands::Issue { command } => {
            IssueCommand::new(&app).execute(&mut stdout, &format, command)?;
        }
        Commands::News(args) => {
            NewsCommand::new(&app).execute(&mut stdout, &format, args)?;
        }
        Commands::Version(args) => {
            VersionCommand::new(&app).execute(&mut stdout, &format, args)?;
        }
        Commands::History { command } => {
            HistoryCommand::new(&app).execute(&mut stdout, &format, command)?;
        }
    }

    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mono_cli::HistoryCommands;

    fn config() -> GlobalConfig {
        GlobalConfig {
            project_identifier: "proj1".into(),
            hostname: "host1".into(),
            sqlite_location: ":memory:".into(),
            ..GlobalConfig::default()
        }
    }

    #[test]
    fn history_runs_against_fresh_database() {
        let cli = Cli::parse_from(["monokit", "history", "news"]);
        assert!(run(cli, config(), true).is_ok());
    }

    #[test]
    fn issue_show_without_credentials_is_fatal() {
        let cli = Cli::parse_from(["monokit", "issue", "show", "4711"]);
        let err = run(cli, config(), false).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn history_parses_tuple() {
        let cli = Cli::parse_from(["monokit", "history", "alarms", "-s", "diskProbe"]);
        assert!(matches!(
            cli.command,
            Commands::History {
                command: HistoryCommands::Alarms { ref tuple, limit: 20 }
            } if tuple.service == "diskProbe"
        ));
    }
}
