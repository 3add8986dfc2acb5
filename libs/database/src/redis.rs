//! Redis connector returning a `ConnectionManager`.

use redis::aio::ConnectionManager;
use redis::Client;
use tracing::info;

use crate::common::{retry_with_backoff, RetryConfig};
use core_config::redis::RedisConfig;

/// Connect to Redis and return a ConnectionManager.
///
/// The ConnectionManager automatically handles connection failures and
/// reconnections. The connection is verified with a PING before returning.
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    info!("Connecting to Redis at {}", url);

    let client = Client::open(url)?;
    let manager = ConnectionManager::new(client).await?;

    let mut conn = manager.clone();
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;

    info!("Successfully connected to Redis");
    Ok(manager)
}

/// Connect using a `RedisConfig`.
pub async fn connect_from_config(config: &RedisConfig) -> redis::RedisResult<ConnectionManager> {
    connect(&config.uri).await
}

/// Connect with automatic retry on failure.
pub async fn connect_with_retry(
    url: &str,
    retry_config: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let config = retry_config.unwrap_or_default();
    retry_with_backoff(|| connect(url), config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires actual Redis
    async fn test_connect() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());

        let result = connect(&redis_url).await;
        assert!(result.is_ok());
    }
}
