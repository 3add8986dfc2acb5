//! Recommendations Domain
//!
//! The middle stage of the completion pipeline. Consumes course completion
//! events, builds a personalized recommendation message and emits a
//! notification event for the email stage.
//!
//! The message comes from an OpenAI-compatible language model when one is
//! configured; otherwise a deterministic fallback template is used, so the
//! stage works without any external AI dependency.

pub mod error;
pub mod generator;
pub mod llm;
pub mod processor;
pub mod publisher;

pub use error::{RecommendationError, RecommendationResult};
pub use generator::{GenerationContext, RecommendationGenerator};
pub use llm::{ChatCompletionClient, OpenAiClient};
pub use processor::RecommendationProcessor;
pub use publisher::{NotificationPublisher, StreamNotificationPublisher};
