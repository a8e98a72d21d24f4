use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the scheduler (default)
    Start,
    /// Run a single job once and exit
    Run {
        /// Job type to run, e.g. trending
        job_type: String,
    },
    /// Check the upstream API and print failure counters
    Health,
    /// Send a test alert e-mail
    TestAlert,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("trendzo-etl").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_arguments_means_start() {
        assert!(parse(&[]).unwrap().command.is_none());
        assert!(matches!(parse(&["start"]).unwrap().command, Some(Commands::Start)));
    }

    #[test]
    fn test_run_takes_job_type() {
        let cli = parse(&["run", "updateStats"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { job_type }) if job_type == "updateStats"));
    }

    #[test]
    fn test_kebab_case_test_alert() {
        assert!(matches!(
            parse(&["test-alert"]).unwrap().command,
            Some(Commands::TestAlert)
        ));
    }

    #[test]
    fn test_unknown_command_and_missing_job_type_are_errors() {
        assert!(parse(&["explode"]).is_err());
        assert!(parse(&["run"]).is_err());
    }
}
