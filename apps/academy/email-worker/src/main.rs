//! Email Worker - Entry Point
//!
//! Background worker that delivers notification events via SMTP.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    academy_email_worker::run().await
}
