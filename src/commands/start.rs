use tokio::signal;
use tracing::{error, info, warn};

use crate::{app::App, jobs::scheduler::Scheduler};

use super::CommandError;

pub async fn handle_start_command(app: App) -> Result<(), CommandError> {
    let mut scheduler = Scheduler::new(&app)?;

    info!(
        environment = %app.environment,
        base_url = %app.config.api.base_url,
        testing_mode = app.config.testing.enabled,
        alerts_enabled = app.alerts.is_enabled(),
        "🚀 Starting ETL scheduler"
    );
    warn_about_degraded_setup(&app);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "❌ Failed to listen for shutdown signal, running until killed");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = scheduler.run() => error!("📅 Scheduler stopped unexpectedly"),
        () = shutdown => info!("🛑 Received shutdown signal, stopping scheduler"),
    }

    info!("👋 ETL scheduler stopped");
    Ok(())
}

/// Problems that leave the scheduler running but with nothing to do or no way
/// to alert. Returns how many were reported.
fn warn_about_degraded_setup(app: &App) -> usize {
    let mut warnings = 0;
    if app.registry.is_empty() {
        warn!("No jobs configured, only health checks will run");
        warnings += 1;
    }
    if app.alerts.is_enabled() && !app.alerts.has_transport() {
        warn!("Alert email is enabled but no mail transport is available, alerts will fail");
        warnings += 1;
    }
    warnings
}
