//! Dead letter queue management.
//!
//! Jobs that exhaust their retries, and payloads that cannot be
//! deserialized at all, are appended to a per-stream DLQ so the main
//! pipeline keeps moving. Entries carry enough context for an operator
//! to inspect and replay them.

use crate::error::StreamError;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// An entry in the dead letter queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    /// ID of the failed job.
    pub job_id: String,
    /// Original job payload as JSON.
    pub job_data: String,
    /// The error that exhausted the retries.
    pub error: String,
    /// Stream entry ID the job last carried in the main stream.
    pub original_stream_id: String,
    /// Retry count at the time of dead-lettering.
    pub retry_count: u32,
    /// When the job was moved to the DLQ.
    pub failed_at: DateTime<Utc>,
}

/// DLQ statistics.
#[derive(Debug, Clone, Serialize)]
pub struct DlqStats {
    pub dlq_stream: String,
    pub length: i64,
}

/// Manages a dead letter queue stream.
pub struct DlqManager {
    redis: Arc<ConnectionManager>,
    dlq_stream: String,
}

impl DlqManager {
    pub fn new(redis: Arc<ConnectionManager>, dlq_stream: impl Into<String>) -> Self {
        Self {
            redis,
            dlq_stream: dlq_stream.into(),
        }
    }

    pub fn dlq_stream(&self) -> &str {
        &self.dlq_stream
    }

    /// Move a failed job to the DLQ.
    pub async fn move_to_dlq(&self, entry: &DlqEntry) -> Result<String, StreamError> {
        let mut conn = (*self.redis).clone();

        let entry_json = serde_json::to_string(entry)?;

        let stream_id: String = redis::cmd("XADD")
            .arg(&self.dlq_stream)
            .arg("*")
            .arg("entry")
            .arg(&entry_json)
            .query_async(&mut conn)
            .await?;

        warn!(
            job_id = %entry.job_id,
            dlq_stream = %self.dlq_stream,
            retry_count = entry.retry_count,
            error = %entry.error,
            "Moved job to DLQ"
        );

        Ok(stream_id)
    }

    /// Current DLQ statistics.
    pub async fn stats(&self) -> Result<DlqStats, StreamError> {
        let mut conn = (*self.redis).clone();
        let length: i64 = conn.xlen(&self.dlq_stream).await?;

        Ok(DlqStats {
            dlq_stream: self.dlq_stream.clone(),
            length,
        })
    }

    /// List DLQ entries, newest first.
    pub async fn list(&self, count: usize) -> Result<Vec<(String, DlqEntry)>, StreamError> {
        let mut conn = (*self.redis).clone();

        let entries: Vec<(String, Vec<(String, String)>)> = redis::cmd("XREVRANGE")
            .arg(&self.dlq_stream)
            .arg("+")
            .arg("-")
            .arg("COUNT")
            .arg(count)
            .query_async(&mut conn)
            .await?;

        let mut result = Vec::new();
        for (stream_id, fields) in entries {
            if let Some((_, json)) = fields.into_iter().find(|(k, _)| k == "entry") {
                match serde_json::from_str::<DlqEntry>(&json) {
                    Ok(entry) => result.push((stream_id, entry)),
                    Err(e) => {
                        warn!(stream_id = %stream_id, error = %e, "Unreadable DLQ entry");
                    }
                }
            }
        }

        Ok(result)
    }

    /// Delete a single DLQ entry, e.g. after a manual replay.
    pub async fn delete(&self, stream_id: &str) -> Result<bool, StreamError> {
        let mut conn = (*self.redis).clone();

        let deleted: i64 = redis::cmd("XDEL")
            .arg(&self.dlq_stream)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    /// Remove all entries from the DLQ.
    pub async fn purge(&self) -> Result<i64, StreamError> {
        let mut conn = (*self.redis).clone();

        let length: i64 = conn.xlen(&self.dlq_stream).await?;
        let _: i64 = redis::cmd("XTRIM")
            .arg(&self.dlq_stream)
            .arg("MAXLEN")
            .arg(0)
            .query_async(&mut conn)
            .await?;

        info!(dlq_stream = %self.dlq_stream, purged = length, "Purged DLQ");
        Ok(length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dlq_entry_serde() {
        let entry = DlqEntry {
            job_id: "job-42".to_string(),
            job_data: r#"{"id":"job-42"}"#.to_string(),
            error: "SMTP connection refused".to_string(),
            original_stream_id: "1700000000000-0".to_string(),
            retry_count: 3,
            failed_at: Utc::now(),
        };

        let json = serde_json::to_string(&entry).unwrap();
        let parsed: DlqEntry = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.job_id, "job-42");
        assert_eq!(parsed.retry_count, 3);
        assert_eq!(parsed.error, "SMTP connection refused");
    }
}
