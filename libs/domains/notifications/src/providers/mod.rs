//! Email providers.

pub mod smtp;

use crate::error::NotificationResult;
use crate::models::EmailMessage;
use async_trait::async_trait;

pub use smtp::SmtpProvider;

/// Trait for sending a single email.
///
/// Implementations can back onto SMTP, an HTTP email API, or a test double.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> NotificationResult<()>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;
}
