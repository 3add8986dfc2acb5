//! Shared axum building blocks: the standard error response type and
//! graceful shutdown plumbing used by every HTTP-facing binary.

pub mod errors;
pub mod shutdown;

pub use errors::{AppError, ErrorResponse};
pub use shutdown::shutdown_signal;
