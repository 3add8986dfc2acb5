use domain_enrollments::EnrollmentError;
use stream_worker::StreamError;
use thiserror::Error;

pub type RecommendationResult<T> = Result<T, RecommendationError>;

/// Errors from the recommendation stage.
#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("Data access error: {0}")]
    DataAccess(#[from] EnrollmentError),

    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Publish error: {0}")]
    Publish(#[from] StreamError),
}

/// Everything here is worth a redelivery: database and publish failures are
/// transient, and a language model error only reaches this level if the
/// generator's fallback itself failed, which should not happen.
impl From<RecommendationError> for StreamError {
    fn from(err: RecommendationError) -> Self {
        match err {
            RecommendationError::Publish(e) => e,
            other => StreamError::transient(other.to_string()),
        }
    }
}
