use std::{
    fmt::{self, Debug},
    sync::{Arc, Mutex, PoisonError},
};

use lettre::{
    transport::smtp::authentication::Credentials, AsyncSmtpTransport, AsyncTransport, Message,
    Tokio1Executor,
};

use crate::config::SmtpConfig;

/// Mock transport that keeps sent alerts in memory.
#[derive(Clone, Default)]
pub struct MockTransport {
    messages: Arc<Mutex<Vec<Message>>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn store_message(&self, message: Message) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }

    /// Messages sent so far, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drops all captured messages.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn clear(&self) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Delivery channel for alert e-mails.
#[derive(Clone)]
pub enum Mailer {
    /// Real SMTP delivery
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    /// In-memory capture for tests
    Mock(MockTransport),
}

impl Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smtp(_) => f.debug_tuple("Mailer::Smtp").finish(),
            Self::Mock(_) => f.debug_tuple("Mailer::Mock").finish(),
        }
    }
}

impl Mailer {
    /// Mailer backed by a fresh [`MockTransport`].
    pub fn mock() -> Self {
        Self::Mock(MockTransport::new())
    }

    /// Builds an SMTP transport. Does not open a connection.
    pub fn smtp(config: &SmtpConfig) -> Result<Self, lettre::transport::smtp::Error> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?.port(config.port)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self::Smtp(builder.build()))
    }

    /// Sends one message through the underlying transport.
    pub async fn send(&self, message: Message) -> Result<(), lettre::transport::smtp::Error> {
        match self {
            Self::Smtp(transport) => {
                transport.send(message).await?;
                Ok(())
            }
            Self::Mock(mock) => {
                mock.store_message(message);
                Ok(())
            }
        }
    }

    /// Sent messages, `None` for a real SMTP mailer.
    pub fn messages(&self) -> Option<Vec<Message>> {
        match self {
            Self::Mock(transport) => Some(transport.messages()),
            Self::Smtp(_) => None,
        }
    }

    /// Empties the mock inbox.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn clear_messages(&self) {
        if let Self::Mock(transport) = self {
            transport.clear();
        }
    }
}
