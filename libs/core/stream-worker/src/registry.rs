//! Stream definitions and the job/processor traits.

use crate::error::StreamError;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

/// Stream definition trait.
///
/// Each domain implements this to bind a stream, its consumer group and its
/// dead-letter stream together under one type.
///
/// # Example
///
/// ```rust,ignore
/// pub struct CompletionStream;
///
/// impl StreamDef for CompletionStream {
///     const STREAM_NAME: &'static str = "enrollments:completed";
///     const CONSUMER_GROUP: &'static str = "recommendation_workers";
///     const DLQ_STREAM: &'static str = "enrollments:completed:dlq";
/// }
/// ```
pub trait StreamDef: Send + Sync {
    /// The Redis stream name.
    const STREAM_NAME: &'static str;

    /// The consumer group name for this stream.
    const CONSUMER_GROUP: &'static str;

    /// The dead letter queue stream name for poison messages.
    const DLQ_STREAM: &'static str;

    /// Maximum stream length before approximate trimming (MAXLEN ~).
    const MAX_LENGTH: i64 = 100_000;

    fn stream_name() -> &'static str {
        Self::STREAM_NAME
    }

    fn consumer_group() -> &'static str {
        Self::CONSUMER_GROUP
    }

    fn dlq_stream() -> &'static str {
        Self::DLQ_STREAM
    }
}

/// Trait for stream job payloads.
///
/// Event types carried on a stream implement this so the worker can track
/// and requeue them across retries.
pub trait StreamJob: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the job ID for logging and tracking.
    fn job_id(&self) -> String;

    /// Returns the current retry count.
    fn retry_count(&self) -> u32;

    /// Creates a copy of the job with an incremented retry count.
    fn with_retry(&self) -> Self;

    /// Maximum retries allowed before moving to the DLQ.
    fn max_retries(&self) -> u32 {
        3
    }

    fn exceeded_max_retries(&self, max_retries: u32) -> bool {
        self.retry_count() >= max_retries
    }
}

/// Trait for job processors.
///
/// Pipeline stages implement this to handle jobs delivered from the stream.
/// Returning `Err` triggers the worker's retry/dead-letter machinery, so a
/// processor that must not lose work on transient failure simply propagates
/// its errors.
#[async_trait]
pub trait StreamProcessor<J: StreamJob>: Send + Sync {
    /// Process a single job.
    async fn process(&self, job: &J) -> Result<(), StreamError>;

    /// Get the processor name for logging.
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Serialize, Deserialize)]
    struct TestJob {
        id: String,
        retry_count: u32,
    }

    impl StreamJob for TestJob {
        fn job_id(&self) -> String {
            self.id.clone()
        }
        fn retry_count(&self) -> u32 {
            self.retry_count
        }
        fn with_retry(&self) -> Self {
            Self {
                id: self.id.clone(),
                retry_count: self.retry_count + 1,
            }
        }
    }

    struct TestStream;
    impl StreamDef for TestStream {
        const STREAM_NAME: &'static str = "test:stream";
        const CONSUMER_GROUP: &'static str = "test_workers";
        const DLQ_STREAM: &'static str = "test:stream:dlq";
    }

    #[test]
    fn test_stream_def() {
        assert_eq!(TestStream::stream_name(), "test:stream");
        assert_eq!(TestStream::consumer_group(), "test_workers");
        assert_eq!(TestStream::dlq_stream(), "test:stream:dlq");
        assert_eq!(TestStream::MAX_LENGTH, 100_000);
    }

    #[test]
    fn test_stream_job_retry() {
        let job = TestJob {
            id: "job-1".to_string(),
            retry_count: 0,
        };

        assert_eq!(job.max_retries(), 3);
        assert!(!job.exceeded_max_retries(3));

        let retried = job.with_retry();
        assert_eq!(retried.retry_count(), 1);
        assert!(retried.with_retry().with_retry().exceeded_max_retries(3));
    }
}
