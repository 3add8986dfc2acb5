//! Publishes notification events to the notification stream.

use async_trait::async_trait;
use domain_notifications::{NotificationEvent, NotificationStream};
use redis::aio::ConnectionManager;
use stream_worker::{StreamError, StreamProducer};
use tracing::debug;

/// Outbound port for notification events.
///
/// Unlike the completion publisher, failures here must propagate: the
/// recommendation stage relies on broker redelivery for correctness.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), StreamError>;
}

/// Publisher backed by the Redis notification stream.
#[derive(Clone)]
pub struct StreamNotificationPublisher {
    producer: StreamProducer,
}

impl StreamNotificationPublisher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            producer: StreamProducer::from_stream_def::<NotificationStream>(redis),
        }
    }
}

#[async_trait]
impl NotificationPublisher for StreamNotificationPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), StreamError> {
        let stream_id = self.producer.send(event).await?;
        debug!(
            event_id = %event.event_id,
            stream_id = %stream_id,
            "Published notification event"
        );
        Ok(())
    }
}
