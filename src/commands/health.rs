use tracing::{info, warn};

use crate::{
    app::App,
    health::{ApiStatus, HealthSnapshot},
};

use super::CommandError;

/// Prints a health snapshot as JSON. An unhealthy upstream is still a
/// successful check.
pub async fn handle_health_command(app: &App) -> Result<HealthSnapshot, CommandError> {
    let snapshot = app.health.check_health().await;

    match serde_json::to_string_pretty(&snapshot) {
        Ok(report) => println!("{report}"),
        Err(e) => warn!(error = %e, "Failed to render health snapshot"),
    }

    match snapshot.api.status {
        ApiStatus::Ok => info!(url = %snapshot.api.url, "🩺 Upstream API is healthy"),
        ApiStatus::Error => warn!(
            url = %snapshot.api.url,
            error = snapshot.api.error.as_deref().unwrap_or_default(),
            "🩺 Upstream API is unhealthy"
        ),
    }

    Ok(snapshot)
}
