use std::{env, ffi::OsString, process::ExitCode, str::FromStr as _};

use clap::Parser as _;
use config_rs::{Config as ConfigRs, ConfigError};
use tracing::{debug, error, info, trace};

use crate::{
    app::App,
    cli::{Cli, Commands},
    commands::{health, run, start, test_alert, CommandError},
    config::Config,
    environment::Environment,
    setup_tracing::setup_tracing,
};

const ENVIRONMENT_VARIABLE: &str = "APP_ENVIRONMENT";

/// Legacy variables from the deployment environment, mapped onto config keys.
/// For each key the first variable that is set wins.
const ENV_OVERRIDES: &[(&str, &[&str])] = &[
    ("api.api_key", &["ETL_API_KEY", "NEXT_PUBLIC_ETL_API_KEY"]),
    ("api.base_url", &["ETL_API_BASE_URL"]),
    ("testing.enabled", &["TESTING_MODE"]),
    ("alerts.enabled", &["ETL_ALERT_EMAIL_ENABLED"]),
    ("alerts.from", &["ETL_ALERT_EMAIL_FROM"]),
    ("alerts.to", &["ETL_ALERT_EMAIL_TO"]),
    ("alerts.smtp.host", &["ETL_ALERT_SMTP_HOST"]),
    ("alerts.smtp.port", &["ETL_ALERT_SMTP_PORT"]),
    ("alerts.smtp.username", &["ETL_ALERT_SMTP_USER"]),
    ("alerts.smtp.password", &["ETL_ALERT_SMTP_PASS"]),
];

/// Parses the command line, loads configuration and runs the command.
///
/// Exit code 0 means the command succeeded, 1 means it failed or the
/// arguments were invalid.
pub async fn boot() -> ExitCode {
    boot_from(env::args_os()).await
}

pub async fn boot_from<I, T>(args: I) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match parse_cli(args) {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let environment = set_environment();

    let app_config = match read_config(&environment) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    setup_tracing(&app_config.tracing);

    debug!("Environment set to: {:?}", environment);
    trace!("Configuration loaded: {:?}", app_config);

    run_command(environment, app_config, cli).await
}

/// Usage errors exit 1, `--help` and `--version` exit 0.
fn parse_cli<I, T>(args: I) -> Result<Cli, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        let _ = e.print();
        if e.use_stderr() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    })
}

/// Runs the command and maps its outcome to the process exit code.
pub async fn run_command(environment: Environment, config: Config, cli: Cli) -> ExitCode {
    match handle_command(environment, config, cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

#[must_use]
pub fn set_environment() -> Environment {
    env::var(ENVIRONMENT_VARIABLE)
        .ok()
        .and_then(|s| Environment::from_str(&s).ok())
        .unwrap_or_default()
}

pub fn read_config(environment: &Environment) -> Result<Config, ConfigError> {
    read_config_with(environment, |name| env::var(name).ok())
}

/// Layers, lowest precedence first: built-in defaults, `config/<environment>`,
/// `APP__*` variables, then the legacy `ETL_*` variables.
pub fn read_config_with(
    environment: &Environment,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let config_file_name = environment.config_file();

    trace!("Reading configuration from: {}", config_file_name);

    let mut builder = ConfigRs::builder()
        .add_source(config_rs::File::with_name(&config_file_name).required(false))
        .add_source(
            config_rs::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        );

    for (key, variables) in ENV_OVERRIDES {
        let value = variables
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.is_empty()));
        builder = builder.set_override_option(*key, value)?;
    }

    builder.build()?.try_deserialize()
}

pub async fn handle_command(
    environment: Environment,
    config: Config,
    cli: Cli,
) -> Result<(), CommandError> {
    let app = App::from_config(config, environment)?;

    match cli.command {
        Some(Commands::Run { job_type }) => {
            run::handle_run_command(&app, &job_type).await?;
        }
        Some(Commands::Health) => {
            health::handle_health_command(&app).await?;
        }
        Some(Commands::TestAlert) => {
            test_alert::handle_test_alert_command(&app).await?;
        }
        Some(Commands::Start) | None => {
            start::handle_start_command(app).await?;
        }
    }

    info!("Command finished");
    Ok(())
}
