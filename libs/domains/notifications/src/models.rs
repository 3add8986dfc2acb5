use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;
use uuid::Uuid;

/// Immutable fact: a notification that should reach a recipient's inbox.
///
/// Produced by the recommendation stage, consumed by the email worker.
/// Student and course ids are carried for traceability only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub event_id: Uuid,
    pub recipient_email: String,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub student_id: Uuid,
    pub course_id: Uuid,
    #[serde(default)]
    pub retry_count: u32,
}

impl NotificationEvent {
    pub fn new(
        recipient_email: impl Into<String>,
        recipient_name: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            recipient_email: recipient_email.into(),
            recipient_name: recipient_name.into(),
            subject: subject.into(),
            body: body.into(),
            student_id,
            course_id,
            retry_count: 0,
        }
    }
}

impl StreamJob for NotificationEvent {
    fn job_id(&self) -> String {
        self.event_id.to_string()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        let mut event = self.clone();
        event.retry_count += 1;
        event
    }
}

/// The outbound email as handed to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub body: String,
}

impl From<&NotificationEvent> for EmailMessage {
    fn from(event: &NotificationEvent) -> Self {
        Self {
            to_email: event.recipient_email.clone(),
            to_name: event.recipient_name.clone(),
            subject: event.subject.clone(),
            body: event.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_to_email_message() {
        let event = NotificationEvent::new(
            "ada@example.com",
            "Ada",
            "Congratulations!",
            "You completed the course.",
            Uuid::now_v7(),
            Uuid::now_v7(),
        );

        let message = EmailMessage::from(&event);
        assert_eq!(message.to_email, "ada@example.com");
        assert_eq!(message.subject, "Congratulations!");
    }

    #[test]
    fn test_retry_round_trip() {
        let event = NotificationEvent::new(
            "ada@example.com",
            "Ada",
            "subject",
            "body",
            Uuid::now_v7(),
            Uuid::now_v7(),
        );

        let retried = event.with_retry();
        assert_eq!(retried.retry_count(), 1);
        assert_eq!(retried.event_id, event.event_id);

        let json = serde_json::to_string(&retried).unwrap();
        let parsed: NotificationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.retry_count(), 1);
    }
}
