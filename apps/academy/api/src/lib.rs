//! Academy API Service
//!
//! HTTP front for the enrollment domain. Completing an enrollment here
//! kicks off the asynchronous recommendation pipeline via the completion
//! stream; the API itself never waits on it.

use axum::{Json, Router, routing::get};
use axum_helpers::shutdown_signal;
use core_config::database::DatabaseConfig;
use core_config::redis::RedisConfig;
use core_config::server::ServerConfig;
use core_config::{Environment, FromEnv};
use domain_enrollments::handlers::{self, ApiDoc};
use domain_enrollments::{
    EnrollmentService, PgCourseRepository, PgEnrollmentRepository, PgStudentRepository,
    StreamCompletionPublisher,
};
use eyre::{Result, WrapErr};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;

/// Run the API server.
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!("Starting academy API service");
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

    let service = EnrollmentService::new(
        PgStudentRepository::new(db.clone()),
        PgCourseRepository::new(db.clone()),
        PgEnrollmentRepository::new(db),
        StreamCompletionPublisher::new(redis),
    );

    let app = Router::new()
        .route("/health", get(health))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api/v1", handlers::router(service))
        .layer(TraceLayer::new_for_http());

    let server_config = ServerConfig::from_env().wrap_err("Failed to load server configuration")?;
    let addr = server_config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    info!(addr = %addr, "Academy API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server failed")?;

    info!("Academy API stopped");
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
