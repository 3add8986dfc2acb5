//! Notifications Domain
//!
//! The final stage of the completion pipeline: delivers notification events
//! as emails. The stage re-throws every provider error so the stream worker
//! retries transient failures and dead-letters poison messages.

pub mod error;
pub mod models;
pub mod processor;
pub mod providers;
pub mod streams;

pub use error::{NotificationError, NotificationResult};
pub use models::{EmailMessage, NotificationEvent};
pub use processor::EmailProcessor;
pub use providers::{EmailProvider, SmtpProvider};
pub use streams::NotificationStream;
