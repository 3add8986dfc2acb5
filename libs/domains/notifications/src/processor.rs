//! The email delivery stage.

use async_trait::async_trait;
use std::sync::Arc;
use stream_worker::{StreamError, StreamProcessor};
use tracing::info;

use crate::models::{EmailMessage, NotificationEvent};
use crate::providers::EmailProvider;

/// Processes notification events by sending them through an email provider.
///
/// Performs no local fallback: every provider error is propagated so the
/// worker's retry and dead-letter machinery decides what happens next.
pub struct EmailProcessor<P: EmailProvider> {
    provider: Arc<P>,
}

impl<P: EmailProvider> EmailProcessor<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }
}

#[async_trait]
impl<P: EmailProvider> StreamProcessor<NotificationEvent> for EmailProcessor<P> {
    async fn process(&self, event: &NotificationEvent) -> Result<(), StreamError> {
        let message = EmailMessage::from(event);
        self.provider.send(&message).await?;

        info!(
            event_id = %event.event_id,
            student_id = %event.student_id,
            course_id = %event.course_id,
            to = %event.recipient_email,
            provider = self.provider.name(),
            "Notification delivered"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email_processor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use crate::providers::MockEmailProvider;
    use stream_worker::ErrorCategory;
    use uuid::Uuid;

    fn event() -> NotificationEvent {
        NotificationEvent::new(
            "ada@example.com",
            "Ada",
            "Congratulations!",
            "Great job on completing the course.",
            Uuid::now_v7(),
            Uuid::now_v7(),
        )
    }

    #[tokio::test]
    async fn test_sends_event_as_email() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .withf(|m| m.to_email == "ada@example.com" && m.subject == "Congratulations!")
            .times(1)
            .returning(|_| Ok(()));
        provider.expect_name().return_const("mock");

        let processor = EmailProcessor::new(provider);
        assert!(processor.process(&event()).await.is_ok());
    }

    #[tokio::test]
    async fn test_transport_errors_propagate_as_transient() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .returning(|_| Err(NotificationError::Transport("connection refused".into())));

        let processor = EmailProcessor::new(provider);
        let err = processor.process(&event()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_invalid_address_propagates_as_permanent() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .returning(|_| Err(NotificationError::InvalidAddress("bad".into())));

        let processor = EmailProcessor::new(provider);
        let err = processor.process(&event()).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }
}
