//! Email Worker Service
//!
//! The final stage of the completion pipeline: consumes notification events
//! and sends them as emails over SMTP.
//!
//! ## Architecture
//!
//! ```text
//! Redis Stream (notifications:email)
//!   ↓ (Consumer Group: email_workers)
//! StreamWorker<NotificationEvent, EmailProcessor>
//!   ↓
//! SMTP (Mailpit in development, TLS relay in production)
//! ```
//!
//! Transport errors are retried with backoff; unparseable payloads and
//! permanently rejected messages go to the dead letter queue.

use axum_helpers::shutdown_signal;
use core_config::redis::RedisConfig;
use core_config::smtp::SmtpConfig;
use core_config::{Environment, FromEnv};
use domain_notifications::{EmailProcessor, NotificationEvent, NotificationStream, SmtpProvider};
use eyre::{Result, WrapErr};
use stream_worker::{StreamWorker, WorkerConfig};
use tokio::sync::watch;
use tracing::info;

/// Run the email worker.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!("Starting email worker service");
    info!("Environment: {:?}", environment);

    let redis_config = RedisConfig::from_env().wrap_err("Failed to load Redis configuration")?;
    info!("Connecting to Redis...");
    let redis = database::redis::connect_with_retry(&redis_config.uri, None)
        .await
        .wrap_err("Failed to connect to Redis")?;

    let smtp_config = SmtpConfig::from_env().wrap_err("Failed to load SMTP configuration")?;
    info!(
        host = %smtp_config.host,
        port = smtp_config.port,
        "SMTP transport configured"
    );
    let provider = SmtpProvider::new(smtp_config).map_err(|e| eyre::eyre!("{e}"))?;
    let processor = EmailProcessor::new(provider);

    let worker_config = WorkerConfig::from_stream_def::<NotificationStream>();
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

    info!("Starting notification event processor...");
    let worker = StreamWorker::<NotificationEvent, _>::new(redis, processor, worker_config);
    worker
        .run(shutdown_rx)
        .await
        .map_err(|e| eyre::eyre!("{}", e))?;

    info!("Email worker service stopped");
    Ok(())
}
