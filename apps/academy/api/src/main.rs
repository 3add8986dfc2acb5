//! Academy API - Entry Point
//!
//! HTTP API for student registration, the course catalog, enrollment and
//! completion.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    academy_api::run().await
}
