//! Stream consumer built on Redis consumer groups.
//!
//! The consumer deals in raw payloads only. Deserialization happens in the
//! worker loop so that a payload that fails to parse can still be moved to
//! the dead letter queue with its original bytes intact.

use crate::config::WorkerConfig;
use crate::error::StreamError;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A raw message read from the stream, not yet deserialized.
#[derive(Debug, Clone)]
pub struct StreamMessage {
    /// Redis stream entry ID.
    pub stream_id: String,
    /// The JSON payload from the `job` field.
    pub payload: String,
}

/// Stream consumer for a single consumer group member.
pub struct StreamConsumer {
    redis: Arc<ConnectionManager>,
    config: WorkerConfig,
}

impl StreamConsumer {
    pub fn new(redis: Arc<ConnectionManager>, config: WorkerConfig) -> Self {
        Self { redis, config }
    }

    pub fn redis(&self) -> Arc<ConnectionManager> {
        self.redis.clone()
    }

    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    pub fn consumer_group(&self) -> &str {
        &self.config.consumer_group
    }

    pub fn consumer_id(&self) -> &str {
        &self.config.consumer_id
    }

    /// Create the consumer group if it doesn't exist yet.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = (*self.redis).clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("0")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
            }
            Err(e) => return Err(StreamError::Redis(e)),
        }

        Ok(())
    }

    /// Read messages delivered to this consumer but not yet acknowledged.
    pub async fn read_pending(&self, count: usize) -> Result<Vec<StreamMessage>, StreamError> {
        let mut conn = (*self.redis).clone();

        let result: RedisResult<Vec<(String, Vec<(String, Vec<(String, String)>)>)>> =
            redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.config.consumer_group)
                .arg(&self.config.consumer_id)
                .arg("COUNT")
                .arg(count)
                .arg("STREAMS")
                .arg(&self.config.stream_name)
                .arg("0")
                .query_async(&mut conn)
                .await;

        match result {
            Ok(streams) => Ok(Self::parse_stream_response(streams)),
            Err(e) if e.to_string().contains("NOGROUP") => Ok(vec![]),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Read new messages, blocking up to the configured timeout.
    pub async fn read_new(&self, count: usize) -> Result<Vec<StreamMessage>, StreamError> {
        let mut conn = (*self.redis).clone();

        let result: RedisResult<Option<Vec<(String, Vec<(String, Vec<(String, String)>)>)>>> =
            redis::cmd("XREADGROUP")
                .arg("GROUP")
                .arg(&self.config.consumer_group)
                .arg(&self.config.consumer_id)
                .arg("BLOCK")
                .arg(self.config.block_timeout_ms)
                .arg("COUNT")
                .arg(count)
                .arg("STREAMS")
                .arg(&self.config.stream_name)
                .arg(">")
                .query_async(&mut conn)
                .await;

        match result {
            Ok(Some(streams)) => Ok(Self::parse_stream_response(streams)),
            Ok(None) => Ok(vec![]),
            Err(e) if e.to_string().contains("NOGROUP") => Ok(vec![]),
            Err(e) => Err(StreamError::Redis(e)),
        }
    }

    /// Acknowledge a message.
    pub async fn ack(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = (*self.redis).clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(stream_id = %stream_id, "Acknowledged message");
        Ok(())
    }

    /// Claim messages abandoned by dead consumers.
    pub async fn claim_abandoned(&self, count: usize) -> Result<Vec<StreamMessage>, StreamError> {
        let mut conn = (*self.redis).clone();

        let pending: RedisResult<Vec<(String, String, i64, i64)>> = redis::cmd("XPENDING")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("-")
            .arg("+")
            .arg(count)
            .query_async(&mut conn)
            .await;

        let pending = match pending {
            Ok(p) => p,
            Err(e) if e.to_string().contains("NOGROUP") => return Ok(vec![]),
            Err(e) => return Err(StreamError::Redis(e)),
        };

        let claim_ids: Vec<String> = pending
            .iter()
            .filter(|(_, _, idle_time, _)| *idle_time > self.config.claim_idle_ms as i64)
            .map(|(id, _, _, _)| id.clone())
            .collect();

        if claim_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut cmd = redis::cmd("XCLAIM");
        cmd.arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg(self.config.claim_idle_ms);

        for id in &claim_ids {
            cmd.arg(id);
        }

        let entries: Vec<(String, Vec<(String, String)>)> = cmd.query_async(&mut conn).await?;
        let messages = Self::parse_entries(entries);

        if !messages.is_empty() {
            warn!(count = messages.len(), "Claimed abandoned messages");
        }

        Ok(messages)
    }

    /// Stream length plus pending count for this consumer group.
    pub async fn stream_info(&self) -> Result<StreamInfo, StreamError> {
        let mut conn = (*self.redis).clone();

        let len: i64 = conn.xlen(&self.config.stream_name).await?;

        let pending: RedisResult<(i64, Option<String>, Option<String>, Option<Vec<(String, i64)>>)> =
            redis::cmd("XPENDING")
                .arg(&self.config.stream_name)
                .arg(&self.config.consumer_group)
                .query_async(&mut conn)
                .await;

        let pending_count = pending.map(|(count, _, _, _)| count).unwrap_or(0);

        Ok(StreamInfo {
            stream_name: self.config.stream_name.clone(),
            length: len,
            pending_count,
            consumer_group: self.config.consumer_group.clone(),
        })
    }

    fn parse_stream_response(
        streams: Vec<(String, Vec<(String, Vec<(String, String)>)>)>,
    ) -> Vec<StreamMessage> {
        streams
            .into_iter()
            .flat_map(|(_stream_name, entries)| Self::parse_entries(entries))
            .collect()
    }

    fn parse_entries(entries: Vec<(String, Vec<(String, String)>)>) -> Vec<StreamMessage> {
        let mut messages = Vec::new();

        for (stream_id, fields) in entries {
            let payload = fields.into_iter().find(|(k, _)| k == "job").map(|(_, v)| v);

            match payload {
                Some(payload) => messages.push(StreamMessage { stream_id, payload }),
                None => {
                    warn!(stream_id = %stream_id, "Missing 'job' field in message");
                }
            }
        }

        messages
    }
}

/// Stream information snapshot.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub stream_name: String,
    pub length: i64,
    pub pending_count: i64,
    pub consumer_group: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries_extracts_job_field() {
        let entries = vec![
            (
                "1-0".to_string(),
                vec![("job".to_string(), r#"{"id":"a"}"#.to_string())],
            ),
            (
                "2-0".to_string(),
                vec![("other".to_string(), "ignored".to_string())],
            ),
        ];

        let messages = StreamConsumer::parse_entries(entries);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].stream_id, "1-0");
        assert_eq!(messages[0].payload, r#"{"id":"a"}"#);
    }
}
