//! Recommendation Worker - Entry Point
//!
//! Background worker that turns course completion events into
//! personalized recommendation notifications.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    academy_recommendation_worker::run().await
}
