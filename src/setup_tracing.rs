use time::macros::format_description;
use tracing_subscriber::{
    fmt::time::OffsetTime, layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use crate::{config::TracingConfig, log_file::DailyFileLayer};

const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "lettre=warn"];

/// Console and daily log file share one filter, so the file mirrors what is
/// printed. Override the configured level with RUST_LOG (e.g. RUST_LOG=debug).
pub fn setup_tracing(config: &TracingConfig) {
    let mut env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    for directive in QUIET_DEPENDENCIES {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .with_timer(OffsetTime::new(
            time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
            format_description!("[hour]:[minute]:[second].[subsecond digits:2]"),
        ))
        .compact();

    let file_layer = if config.log_to_file {
        match DailyFileLayer::new(&config.log_dir) {
            Ok(layer) => Some(layer),
            Err(e) => {
                eprintln!("⚠️ Could not open log directory '{}': {e}", config.log_dir);
                None
            }
        }
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}
