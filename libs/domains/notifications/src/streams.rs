//! Stream topology for notification events.

use stream_worker::StreamDef;

/// Outbound email notifications, consumed by the email workers.
pub struct NotificationStream;

impl StreamDef for NotificationStream {
    const STREAM_NAME: &'static str = "notifications:email";
    const CONSUMER_GROUP: &'static str = "email_workers";
    const DLQ_STREAM: &'static str = "notifications:email:dlq";
}
