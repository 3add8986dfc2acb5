//! The generic worker loop.
//!
//! Ties the consumer, producer and DLQ manager together: messages are read
//! from the consumer group, handed to the processor, and acknowledged.
//! Failed jobs are requeued to the stream tail with an incremented retry
//! count (the tail position itself provides the retry delay) or moved to
//! the DLQ once retries are exhausted.

use crate::config::WorkerConfig;
use crate::consumer::{StreamConsumer, StreamMessage};
use crate::dlq::{DlqEntry, DlqManager};
use crate::error::{ErrorCategory, StreamError};
use crate::producer::StreamProducer;
use crate::registry::{StreamJob, StreamProcessor};
use chrono::Utc;
use redis::aio::ConnectionManager;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// What to do with a job that failed processing.
#[derive(Debug, PartialEq, Eq)]
enum FailureAction {
    Requeue,
    DeadLetter,
}

fn failure_action(err: &StreamError, retry_count: u32, max_retries: u32) -> FailureAction {
    // The job's own counter caps retries even for categories that allow more
    if retry_count >= max_retries {
        return FailureAction::DeadLetter;
    }
    if err.should_retry(retry_count) {
        FailureAction::Requeue
    } else {
        FailureAction::DeadLetter
    }
}

/// A generic stream worker processing jobs of type `J` with processor `P`.
pub struct StreamWorker<J, P>
where
    J: StreamJob,
    P: StreamProcessor<J>,
{
    consumer: StreamConsumer,
    producer: StreamProducer,
    dlq: DlqManager,
    processor: Arc<P>,
    config: WorkerConfig,
    _job: PhantomData<J>,
}

impl<J, P> StreamWorker<J, P>
where
    J: StreamJob,
    P: StreamProcessor<J>,
{
    pub fn new(redis: ConnectionManager, processor: P, config: WorkerConfig) -> Self {
        let redis = Arc::new(redis);
        let consumer = StreamConsumer::new(redis.clone(), config.clone());
        let producer = StreamProducer::new((*redis).clone(), config.stream_name.clone())
            .with_max_length(config.max_length);
        let dlq = DlqManager::new(redis, config.dlq_stream.clone());

        Self {
            consumer,
            producer,
            dlq,
            processor: Arc::new(processor),
            config,
            _job: PhantomData,
        }
    }

    /// Run the worker until the shutdown signal flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), StreamError> {
        info!(
            stream = %self.config.stream_name,
            group = %self.config.consumer_group,
            consumer = %self.config.consumer_id,
            "Starting stream worker"
        );

        self.consumer.ensure_consumer_group().await?;

        // Drain messages left over from a previous run of this consumer ID
        self.process_pending().await;

        let mut consecutive_errors: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                result = self.process_cycle() => {
                    match result {
                        Ok(processed) => {
                            consecutive_errors = 0;
                            if processed == 0 {
                                tokio::time::sleep(Duration::from_millis(
                                    self.config.poll_interval_ms,
                                ))
                                .await;
                            }
                        }
                        Err(e) => {
                            consecutive_errors += 1;
                            let delay =
                                ErrorCategory::Transient.backoff_delay_ms(consecutive_errors - 1);
                            error!(
                                error = %e,
                                consecutive_errors,
                                retry_in_ms = delay,
                                "Worker cycle failed"
                            );
                            tokio::time::sleep(Duration::from_millis(delay)).await;

                            // The group may have been deleted out from under us
                            if let Err(e) = self.consumer.ensure_consumer_group().await {
                                error!(error = %e, "Failed to re-ensure consumer group");
                            }
                        }
                    }
                }
            }
        }

        info!(
            stream = %self.config.stream_name,
            consumer = %self.config.consumer_id,
            "Stream worker stopped"
        );
        Ok(())
    }

    /// One poll cycle: claim abandoned messages, then read new ones.
    /// Returns the number of messages handled.
    async fn process_cycle(&self) -> Result<usize, StreamError> {
        let mut handled = 0;

        let abandoned = self.consumer.claim_abandoned(self.config.batch_size).await?;
        for message in abandoned {
            self.handle_message(message).await;
            handled += 1;
        }

        let new = self.consumer.read_new(self.config.batch_size).await?;
        for message in new {
            self.handle_message(message).await;
            handled += 1;
        }

        Ok(handled)
    }

    async fn process_pending(&self) {
        match self.consumer.read_pending(self.config.batch_size).await {
            Ok(messages) => {
                if !messages.is_empty() {
                    info!(count = messages.len(), "Processing pending messages");
                }
                for message in messages {
                    self.handle_message(message).await;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read pending messages");
            }
        }
    }

    /// Process a single message and settle it: ack on success, requeue with
    /// incremented retry count on retryable failure, dead-letter otherwise.
    /// The message is always acknowledged so it never wedges the group.
    async fn handle_message(&self, message: StreamMessage) {
        let job: J = match serde_json::from_str(&message.payload) {
            Ok(job) => job,
            Err(e) => {
                warn!(
                    stream_id = %message.stream_id,
                    error = %e,
                    "Unparseable payload, moving to DLQ"
                );
                self.dead_letter(&message, "unknown", 0, &format!("deserialize: {e}"))
                    .await;
                self.ack(&message.stream_id).await;
                return;
            }
        };

        let job_id = job.job_id();

        match self.processor.process(&job).await {
            Ok(()) => {
                debug!(
                    job_id = %job_id,
                    processor = self.processor.name(),
                    "Job processed"
                );
            }
            Err(e) => {
                match failure_action(&e, job.retry_count(), self.config.max_retries) {
                    FailureAction::Requeue => {
                        let retried = job.with_retry();
                        warn!(
                            job_id = %job_id,
                            retry_count = retried.retry_count(),
                            error = %e,
                            "Job failed, requeuing"
                        );
                        if let Err(send_err) = self.producer.send(&retried).await {
                            error!(
                                job_id = %job_id,
                                error = %send_err,
                                "Failed to requeue job, moving to DLQ"
                            );
                            self.dead_letter(
                                &message,
                                &job_id,
                                job.retry_count(),
                                &format!("{e}; requeue failed: {send_err}"),
                            )
                            .await;
                        }
                    }
                    FailureAction::DeadLetter => {
                        self.dead_letter(&message, &job_id, job.retry_count(), &e.to_string())
                            .await;
                    }
                }
            }
        }

        self.ack(&message.stream_id).await;
    }

    async fn dead_letter(&self, message: &StreamMessage, job_id: &str, retry_count: u32, err: &str) {
        let entry = DlqEntry {
            job_id: job_id.to_string(),
            job_data: message.payload.clone(),
            error: err.to_string(),
            original_stream_id: message.stream_id.clone(),
            retry_count,
            failed_at: Utc::now(),
        };

        if let Err(e) = self.dlq.move_to_dlq(&entry).await {
            // Last resort: the job is lost from the DLQ's point of view,
            // but the full payload is in the log for manual recovery.
            error!(
                job_id = %job_id,
                payload = %message.payload,
                error = %e,
                "Failed to write DLQ entry"
            );
        }
    }

    async fn ack(&self, stream_id: &str) {
        if let Err(e) = self.consumer.ack(stream_id).await {
            warn!(stream_id = %stream_id, error = %e, "Failed to ack message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_failures_requeue_until_max() {
        let err = StreamError::transient("timeout");
        assert_eq!(failure_action(&err, 0, 3), FailureAction::Requeue);
        assert_eq!(failure_action(&err, 2, 3), FailureAction::Requeue);
        assert_eq!(failure_action(&err, 3, 3), FailureAction::DeadLetter);
    }

    #[test]
    fn test_permanent_failures_dead_letter_immediately() {
        let err = StreamError::permanent("invalid recipient");
        assert_eq!(failure_action(&err, 0, 3), FailureAction::DeadLetter);
    }

    #[test]
    fn test_rate_limited_capped_by_worker_max() {
        // RateLimited allows 5 retries, but the worker's own cap wins
        let err = StreamError::rate_limited("429");
        assert_eq!(failure_action(&err, 3, 3), FailureAction::DeadLetter);
        assert_eq!(failure_action(&err, 3, 5), FailureAction::Requeue);
    }
}
