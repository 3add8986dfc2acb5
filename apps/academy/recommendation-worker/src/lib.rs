//! Recommendation Worker Service
//!
//! A background worker that consumes course completion events and emits
//! notification events for the email worker.
//!
//! ## Architecture
//!
//! ```text
//! Redis Stream (enrollments:completed)
//!   ↓ (Consumer Group: recommendation_workers)
//! StreamWorker<CourseCompletedEvent, RecommendationProcessor>
//!   ↓ (history + candidates from PostgreSQL, message from LLM or fallback)
//! Redis Stream (notifications:email)
//! ```
//!
//! ## Features
//!
//! - Consumer group support for horizontal scaling
//! - Automatic retry with exponential backoff
//! - Dead letter queue for poison messages
//! - Deterministic fallback when no language model is configured
//! - Graceful shutdown handling

use axum_helpers::shutdown_signal;
use core_config::database::DatabaseConfig;
use core_config::llm::LlmConfig;
use core_config::redis::RedisConfig;
use core_config::{Environment, FromEnv};
use domain_enrollments::{CompletionStream, CourseCompletedEvent, PgCourseRepository, PgEnrollmentRepository};
use domain_recommendations::{
    OpenAiClient, RecommendationGenerator, RecommendationProcessor, StreamNotificationPublisher,
};
use eyre::{Result, WrapErr};
use std::sync::Arc;
use stream_worker::{StreamWorker, WorkerConfig};
use tokio::sync::watch;
use tracing::info;

/// Run the recommendation worker.
///
/// 1. Sets up structured logging (env-aware: JSON for prod, pretty for dev)
/// 2. Connects to PostgreSQL for enrollment history and the catalog
/// 3. Connects to Redis for stream processing
/// 4. Starts the worker with graceful shutdown handling
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!("Starting recommendation worker service");
    info!("Environment: {:?}", environment);

    let db_config = DatabaseConfig::from_env().wrap_err("Failed to load database configuration")?;
    info!("Connecting to PostgreSQL...");
    let db = database::postgres::connect_with_retry(&db_config.url, None)
        .await
        .wrap_err("Failed to connect to PostgreSQL")?;

    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    info!("Connecting to Redis...");
    let redis = database::redis::connect_with_retry(&redis_config.uri, None)
        .await
        .wrap_err("Failed to connect to Redis")?;

    // The language model is optional; without it the generator uses its
    // deterministic fallback template
    let generator = match LlmConfig::from_env_optional()? {
        Some(llm_config) => {
            info!(model = %llm_config.model, "Language model configured");
            let client = OpenAiClient::new(llm_config).map_err(|e| eyre::eyre!("{e}"))?;
            RecommendationGenerator::with_client(Arc::new(client))
        }
        None => {
            info!("No language model configured, using fallback messages");
            RecommendationGenerator::without_client()
        }
    };

    let processor = RecommendationProcessor::new(
        PgEnrollmentRepository::new(db.clone()),
        PgCourseRepository::new(db),
        generator,
        StreamNotificationPublisher::new(redis.clone()),
    );

    let worker_config = WorkerConfig::from_stream_def::<CompletionStream>();
    info!(
        stream = %worker_config.stream_name,
        consumer_group = %worker_config.consumer_group,
        consumer_id = %worker_config.consumer_id,
        "Worker configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    info!("Starting completion event processor...");
    let worker = StreamWorker::<CourseCompletedEvent, _>::new(redis, processor, worker_config);
    worker
        .run(shutdown_rx)
        .await
        .map_err(|e| eyre::eyre!("{}", e))?;

    info!("Recommendation worker service stopped");
    Ok(())
}
