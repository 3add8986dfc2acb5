//! Publishes completion events to the completion stream.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use stream_worker::{StreamError, StreamProducer};
use tracing::debug;

use crate::events::CourseCompletedEvent;
use crate::streams::CompletionStream;

/// Outbound port for completion events.
///
/// The service layer treats publishing as fire-and-forget: a failed publish
/// is logged there and never rolls back the completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionPublisher: Send + Sync {
    async fn publish(&self, event: &CourseCompletedEvent) -> Result<(), StreamError>;
}

/// Publisher backed by the Redis completion stream.
#[derive(Clone)]
pub struct StreamCompletionPublisher {
    producer: StreamProducer,
}

impl StreamCompletionPublisher {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            producer: StreamProducer::from_stream_def::<CompletionStream>(redis),
        }
    }
}

#[async_trait]
impl CompletionPublisher for StreamCompletionPublisher {
    async fn publish(&self, event: &CourseCompletedEvent) -> Result<(), StreamError> {
        let stream_id = self.producer.send(event).await?;
        debug!(
            event_id = %event.event_id,
            stream_id = %stream_id,
            "Published completion event"
        );
        Ok(())
    }
}
