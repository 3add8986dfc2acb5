//! SMTP provider built on lettre.
//!
//! Works against Mailpit/MailHog in development and a TLS relay with
//! credentials in production.

use async_trait::async_trait;
use core_config::smtp::SmtpConfig;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::EmailProvider;
use crate::error::{NotificationError, NotificationResult};
use crate::models::EmailMessage;

pub struct SmtpProvider {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    config: Arc<SmtpConfig>,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> NotificationResult<Self> {
        let transport = Self::build_transport(&config)?;
        Ok(Self {
            transport,
            config: Arc::new(config),
        })
    }

    fn build_transport(
        config: &SmtpConfig,
    ) -> NotificationResult<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| {
                    NotificationError::Config(format!("Failed to create SMTP relay: {e}"))
                })?
                .port(config.port)
        } else {
            // Non-TLS transport for local dev servers like Mailpit
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host).port(config.port)
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    fn build_message(&self, email: &EmailMessage) -> NotificationResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| NotificationError::Config(format!("Invalid from address: {e}")))?;

        let to: Mailbox = if email.to_name.is_empty() {
            email.to_email.parse()
        } else {
            format!("{} <{}>", email.to_name, email.to_email).parse()
        }
        .map_err(|e| {
            NotificationError::InvalidAddress(format!("{}: {e}", email.to_email))
        })?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(&email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| NotificationError::InvalidMessage(e.to_string()))
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &EmailMessage) -> NotificationResult<()> {
        debug!(
            to = %email.to_email,
            subject = %email.subject,
            host = %self.config.host,
            port = self.config.port,
            "Sending email via SMTP"
        );

        let message = self.build_message(email)?;

        self.transport.send(message).await.map_err(|e| {
            error!(to = %email.to_email, error = %e, "Failed to send email via SMTP");
            if e.is_permanent() {
                NotificationError::Rejected(e.to_string())
            } else {
                NotificationError::Transport(e.to_string())
            }
        })?;

        info!(to = %email.to_email, "Email sent via SMTP");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

// AsyncSmtpTransport is not Clone; rebuild it from config
impl Clone for SmtpProvider {
    fn clone(&self) -> Self {
        let transport = Self::build_transport(&self.config)
            .unwrap_or_else(|_| AsyncSmtpTransport::<Tokio1Executor>::unencrypted_localhost());
        Self {
            transport,
            config: Arc::clone(&self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailpit_provider() -> SmtpProvider {
        SmtpProvider::new(SmtpConfig {
            host: "localhost".to_string(),
            port: 1025,
            from_email: "noreply@academy.local".to_string(),
            from_name: "Academy".to_string(),
            username: None,
            password: None,
            use_tls: false,
        })
        .unwrap()
    }

    #[test]
    fn test_build_message() {
        let provider = mailpit_provider();
        let message = provider.build_message(&EmailMessage {
            to_email: "ada@example.com".to_string(),
            to_name: "Ada".to_string(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
        });
        assert!(message.is_ok());
    }

    #[test]
    fn test_invalid_recipient_is_permanent() {
        let provider = mailpit_provider();
        let result = provider.build_message(&EmailMessage {
            to_email: "not an email".to_string(),
            to_name: String::new(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
        });
        assert!(matches!(result, Err(NotificationError::InvalidAddress(_))));
    }
}
