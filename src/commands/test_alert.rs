use chrono::Utc;
use tracing::{info, warn};

use crate::{
    alerts::{AlertDelivery, AlertMessage},
    app::App,
};

use super::CommandError;

/// Sends a fixed test alert. Delivery problems are reported, not raised.
pub async fn handle_test_alert_command(app: &App) -> Result<AlertDelivery, CommandError> {
    info!(enabled = app.alerts.is_enabled(), "📧 Sending test alert");

    let delivery = app
        .alerts
        .send_alert(&AlertMessage::test_alert(Utc::now()))
        .await;

    match delivery {
        AlertDelivery::Sent => info!("✅ Test alert sent"),
        AlertDelivery::Skipped => warn!("Test alert skipped, alert email is disabled"),
        AlertDelivery::Failed => warn!("Test alert could not be delivered, see errors above"),
    }

    Ok(delivery)
}
