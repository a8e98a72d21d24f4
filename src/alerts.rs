pub mod templates;

use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    Message,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{config::AlertConfig, mailer::Mailer};

pub use templates::AlertMessage;

const SUBJECT_PREFIX: &str = "[ETL Alert]";

#[derive(Error, Debug)]
pub enum AlertDeliveryError {
    #[error("No {0} address configured for alerts")]
    MissingAddress(&'static str),
    #[error("Invalid alert address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),
    #[error("Failed to build alert email: {0}")]
    BuilderError(#[from] lettre::error::Error),
    #[error("Failed to send alert email: {0}")]
    TransportError(#[from] lettre::transport::smtp::Error),
    #[error("Mail transport unavailable: {0}")]
    TransportUnavailable(String),
}

/// What happened to an alert. Delivery problems are reported here, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDelivery {
    Sent,
    Skipped,
    Failed,
}

#[derive(Debug)]
enum Transport {
    Disabled,
    Ready(Mailer),
    Unavailable(String),
}

/// Sends alert e-mails. Alerting must never take the scheduler down, so every
/// failure is logged and swallowed.
#[derive(Debug)]
pub struct AlertSender {
    config: AlertConfig,
    transport: Transport,
}

impl AlertSender {
    /// Builds the SMTP transport only when alerting is enabled.
    pub fn from_config(config: &AlertConfig) -> Self {
        let transport = if config.enabled {
            match Mailer::smtp(&config.smtp) {
                Ok(mailer) => Transport::Ready(mailer),
                Err(e) => {
                    error!(host = %config.smtp.host, error = %e, "❌ Failed to set up alert mail transport");
                    Transport::Unavailable(e.to_string())
                }
            }
        } else {
            Transport::Disabled
        };

        Self {
            config: config.clone(),
            transport,
        }
    }

    /// Uses the given mailer instead of SMTP, still honoring `enabled`.
    pub fn with_mailer(config: &AlertConfig, mailer: Mailer) -> Self {
        let transport = if config.enabled {
            Transport::Ready(mailer)
        } else {
            Transport::Disabled
        };

        Self {
            config: config.clone(),
            transport,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// False when alerting is disabled or the transport could not be built.
    #[must_use]
    pub const fn has_transport(&self) -> bool {
        matches!(self.transport, Transport::Ready(_))
    }

    pub async fn send_alert(&self, alert: &AlertMessage) -> AlertDelivery {
        let mailer = match &self.transport {
            Transport::Disabled => {
                info!(subject = %alert.subject, "Alert email disabled, skipping alert");
                return AlertDelivery::Skipped;
            }
            Transport::Unavailable(reason) => {
                let e = AlertDeliveryError::TransportUnavailable(reason.clone());
                error!(subject = %alert.subject, error = %e, "❌ Failed to send alert email");
                return AlertDelivery::Failed;
            }
            Transport::Ready(mailer) => mailer,
        };

        match self.deliver(mailer, alert).await {
            Ok(()) => {
                info!(subject = %alert.subject, "📧 Alert email sent");
                AlertDelivery::Sent
            }
            Err(e) => {
                error!(subject = %alert.subject, error = %e, "❌ Failed to send alert email");
                AlertDelivery::Failed
            }
        }
    }

    async fn deliver(&self, mailer: &Mailer, alert: &AlertMessage) -> Result<(), AlertDeliveryError> {
        let message = self.build_message(alert)?;
        debug!(subject = %alert.subject, "Delivering alert email");
        mailer.send(message).await?;
        Ok(())
    }

    fn build_message(&self, alert: &AlertMessage) -> Result<Message, AlertDeliveryError> {
        let from: Mailbox = self
            .config
            .from
            .as_deref()
            .ok_or(AlertDeliveryError::MissingAddress("sender"))?
            .parse()?;

        let recipients = self
            .config
            .to
            .as_deref()
            .ok_or(AlertDeliveryError::MissingAddress("recipient"))?;

        let mut builder = Message::builder()
            .from(from)
            .subject(format!("{SUBJECT_PREFIX} {}", alert.subject));

        let mut has_recipient = false;
        for recipient in recipients.split(',').map(str::trim).filter(|r| !r.is_empty()) {
            builder = builder.to(recipient.parse()?);
            has_recipient = true;
        }
        if !has_recipient {
            warn!("Alert recipient list is empty");
            return Err(AlertDeliveryError::MissingAddress("recipient"));
        }

        let message = builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(alert.text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(alert.html.clone()),
                ),
        )?;

        Ok(message)
    }
}
