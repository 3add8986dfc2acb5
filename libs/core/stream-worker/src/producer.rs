//! Stream producer for enqueuing jobs.
//!
//! # Example
//!
//! ```rust,ignore
//! use stream_worker::StreamProducer;
//!
//! let producer = StreamProducer::from_stream_def::<CompletionStream>(redis);
//! let message_id = producer.send(&event).await?;
//! ```

use crate::error::StreamError;
use crate::registry::StreamDef;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Generic stream producer for enqueuing jobs.
///
/// Used by API services and upstream pipeline stages to queue jobs for
/// background processing by workers.
pub struct StreamProducer {
    redis: Arc<ConnectionManager>,
    stream_name: String,
    max_length: i64,
}

impl StreamProducer {
    pub fn new(redis: ConnectionManager, stream_name: impl Into<String>) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: stream_name.into(),
            max_length: 100_000,
        }
    }

    /// Create a producer from a `StreamDef` implementation.
    ///
    /// Preferred over `new` since it keeps the stream name and max length
    /// consistent with the consuming worker.
    pub fn from_stream_def<S: StreamDef>(redis: ConnectionManager) -> Self {
        Self {
            redis: Arc::new(redis),
            stream_name: S::STREAM_NAME.to_string(),
            max_length: S::MAX_LENGTH,
        }
    }

    pub fn with_max_length(mut self, max_length: i64) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// Enqueue a job. Returns the Redis stream message ID.
    pub async fn send<J: Serialize>(&self, job: &J) -> Result<String, StreamError> {
        let mut conn = (*self.redis).clone();

        let job_json = serde_json::to_string(job)?;

        // MAXLEN ~ for approximate trimming
        let stream_id: String = redis::cmd("XADD")
            .arg(&self.stream_name)
            .arg("MAXLEN")
            .arg("~")
            .arg(self.max_length)
            .arg("*")
            .arg("job")
            .arg(&job_json)
            .query_async(&mut conn)
            .await?;

        debug!(
            stream = %self.stream_name,
            stream_id = %stream_id,
            "Enqueued job"
        );

        Ok(stream_id)
    }

    /// Enqueue multiple jobs in a single pipeline.
    pub async fn send_batch<J: Serialize>(&self, jobs: &[J]) -> Result<Vec<String>, StreamError> {
        if jobs.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = (*self.redis).clone();
        let mut pipe = redis::pipe();

        for job in jobs {
            let job_json = serde_json::to_string(job)?;
            pipe.cmd("XADD")
                .arg(&self.stream_name)
                .arg("MAXLEN")
                .arg("~")
                .arg(self.max_length)
                .arg("*")
                .arg("job")
                .arg(&job_json);
        }

        let results: Vec<String> = pipe.query_async(&mut conn).await?;

        debug!(
            stream = %self.stream_name,
            count = results.len(),
            "Enqueued batch of jobs"
        );

        Ok(results)
    }

    /// Current stream length.
    pub async fn stream_length(&self) -> Result<i64, StreamError> {
        let mut conn = (*self.redis).clone();
        let len: i64 = conn.xlen(&self.stream_name).await?;
        Ok(len)
    }
}

impl Clone for StreamProducer {
    fn clone(&self) -> Self {
        Self {
            redis: self.redis.clone(),
            stream_name: self.stream_name.clone(),
            max_length: self.max_length,
        }
    }
}
