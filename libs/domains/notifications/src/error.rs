use stream_worker::StreamError;
use thiserror::Error;

pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors from the notification domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Recipient or sender address that will never parse.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Failed to construct the outbound message.
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Transport-level failure talking to the mail server.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The mail server rejected the message permanently (5xx).
    #[error("Rejected by mail server: {0}")]
    Rejected(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A bad address or message can never succeed on retry; transport errors
/// are worth redelivering.
impl From<NotificationError> for StreamError {
    fn from(err: NotificationError) -> Self {
        match err {
            NotificationError::InvalidAddress(_)
            | NotificationError::InvalidMessage(_)
            | NotificationError::Rejected(_)
            | NotificationError::Config(_) => StreamError::permanent(err.to_string()),
            NotificationError::Transport(_) => StreamError::transient(err.to_string()),
        }
    }
}
