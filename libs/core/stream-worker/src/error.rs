//! Error types and retry categorization for stream processing.

use thiserror::Error;

/// How a processing failure should be treated by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Temporary failure, retry with exponential backoff.
    Transient,
    /// Unrecoverable failure, move to DLQ immediately.
    Permanent,
    /// Upstream rate limit, retry with longer delays.
    RateLimited,
}

impl ErrorCategory {
    /// Maximum retry attempts for this category.
    pub fn max_retries(&self) -> u32 {
        match self {
            ErrorCategory::Transient => 3,
            ErrorCategory::Permanent => 0,
            ErrorCategory::RateLimited => 5,
        }
    }

    /// Base delay in milliseconds before the first retry.
    pub fn base_delay_ms(&self) -> u64 {
        match self {
            ErrorCategory::Transient => 1_000,
            ErrorCategory::Permanent => 0,
            ErrorCategory::RateLimited => 5_000,
        }
    }

    /// Ceiling on the backoff delay in milliseconds.
    pub fn max_delay_ms(&self) -> u64 {
        match self {
            ErrorCategory::Transient => 30_000,
            ErrorCategory::Permanent => 0,
            ErrorCategory::RateLimited => 120_000,
        }
    }

    /// Exponential backoff delay for the given attempt, capped at the
    /// category's maximum.
    pub fn backoff_delay_ms(&self, attempt: u32) -> u64 {
        let delay = self.base_delay_ms().saturating_mul(2u64.saturating_pow(attempt));
        delay.min(self.max_delay_ms())
    }
}

/// Errors produced while consuming, processing or producing stream jobs.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Processing error: {message}")]
    Processing {
        message: String,
        category: ErrorCategory,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StreamError {
    /// A transient processing error, retried with backoff.
    pub fn transient(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    /// A permanent processing error, dead-lettered without retry.
    pub fn permanent(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    /// A rate-limit error, retried with longer delays.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        StreamError::Processing {
            message: message.into(),
            category: ErrorCategory::RateLimited,
        }
    }

    /// The retry category for this error.
    ///
    /// Redis errors are transient (the connection manager reconnects);
    /// serialization errors are permanent since the payload will never parse
    /// differently on a retry.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Redis(_) => ErrorCategory::Transient,
            StreamError::Serialization(_) => ErrorCategory::Permanent,
            StreamError::Processing { category, .. } => *category,
            StreamError::Config(_) => ErrorCategory::Permanent,
        }
    }

    /// Whether the job should be retried given how many attempts it has had.
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count < self.category().max_retries()
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delays() {
        let cat = ErrorCategory::Transient;
        assert_eq!(cat.backoff_delay_ms(0), 1_000);
        assert_eq!(cat.backoff_delay_ms(1), 2_000);
        assert_eq!(cat.backoff_delay_ms(2), 4_000);
        // Capped at max
        assert_eq!(cat.backoff_delay_ms(10), 30_000);

        let cat = ErrorCategory::RateLimited;
        assert_eq!(cat.backoff_delay_ms(0), 5_000);
        assert_eq!(cat.backoff_delay_ms(5), 120_000);
    }

    #[test]
    fn test_should_retry() {
        let err = StreamError::transient("connection reset");
        assert!(err.should_retry(0));
        assert!(err.should_retry(2));
        assert!(!err.should_retry(3));

        let err = StreamError::permanent("malformed payload");
        assert!(!err.should_retry(0));

        let err = StreamError::rate_limited("429 from provider");
        assert!(err.should_retry(4));
        assert!(!err.should_retry(5));
    }

    #[test]
    fn test_serialization_errors_are_permanent() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: StreamError = json_err.into();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }
}
