//! Worker runtime configuration.

use crate::registry::StreamDef;
use uuid::Uuid;

/// Configuration for a stream worker instance.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Stream to consume from.
    pub stream_name: String,
    /// Consumer group name.
    pub consumer_group: String,
    /// Unique consumer ID within the group.
    pub consumer_id: String,
    /// Dead letter queue stream.
    pub dlq_stream: String,
    /// Maximum stream length (approximate trimming).
    pub max_length: i64,
    /// Number of messages to read per batch.
    pub batch_size: usize,
    /// How long XREADGROUP blocks waiting for new messages, in milliseconds.
    pub block_timeout_ms: u64,
    /// Sleep between empty polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Idle time before claiming messages from dead consumers, in milliseconds.
    pub claim_idle_ms: u64,
    /// Retries before a failing job is dead-lettered.
    pub max_retries: u32,
}

impl WorkerConfig {
    /// Build a config from a stream definition, with generated consumer ID.
    pub fn from_stream_def<S: StreamDef>() -> Self {
        Self {
            stream_name: S::STREAM_NAME.to_string(),
            consumer_group: S::CONSUMER_GROUP.to_string(),
            consumer_id: format!("worker-{}", Uuid::new_v4()),
            dlq_stream: S::DLQ_STREAM.to_string(),
            max_length: S::MAX_LENGTH,
            batch_size: 10,
            block_timeout_ms: 5_000,
            poll_interval_ms: 100,
            claim_idle_ms: 60_000,
            max_retries: 3,
        }
    }

    pub fn with_consumer_id(mut self, consumer_id: impl Into<String>) -> Self {
        self.consumer_id = consumer_id.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_block_timeout_ms(mut self, block_timeout_ms: u64) -> Self {
        self.block_timeout_ms = block_timeout_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStream;
    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test:events";
        const CONSUMER_GROUP: &'static str = "test_workers";
        const DLQ_STREAM: &'static str = "test:events:dlq";
    }

    #[test]
    fn test_from_stream_def() {
        let config = WorkerConfig::from_stream_def::<TestStream>();
        assert_eq!(config.stream_name, "test:events");
        assert_eq!(config.consumer_group, "test_workers");
        assert_eq!(config.dlq_stream, "test:events:dlq");
        assert!(config.consumer_id.starts_with("worker-"));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_builders() {
        let config = WorkerConfig::from_stream_def::<TestStream>()
            .with_consumer_id("worker-1")
            .with_batch_size(25)
            .with_max_retries(5);

        assert_eq!(config.consumer_id, "worker-1");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.max_retries, 5);
    }
}
