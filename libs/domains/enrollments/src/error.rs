use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;
use uuid::Uuid;

pub type EnrollmentResult<T> = Result<T, EnrollmentError>;

/// Errors for the enrollment domain.
#[derive(Debug, Error)]
pub enum EnrollmentError {
    #[error("Student not found: {0}")]
    StudentNotFound(Uuid),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Enrollment not found: {0}")]
    EnrollmentNotFound(Uuid),

    #[error("Student {student_id} already has an enrollment for course {course_code}")]
    AlreadyEnrolled { student_id: Uuid, course_code: String },

    #[error("Enrollment {0} is already completed")]
    AlreadyCompleted(Uuid),

    #[error("Grade must be between 0.0 and 10.0, got {0}")]
    InvalidGrade(f64),

    #[error("Duplicate code: {0}")]
    DuplicateCode(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl From<EnrollmentError> for AppError {
    fn from(err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::StudentNotFound(_)
            | EnrollmentError::CourseNotFound(_)
            | EnrollmentError::EnrollmentNotFound(_) => AppError::NotFound(err.to_string()),
            EnrollmentError::AlreadyEnrolled { .. }
            | EnrollmentError::AlreadyCompleted(_)
            | EnrollmentError::DuplicateCode(_) => AppError::Conflict(err.to_string()),
            EnrollmentError::InvalidGrade(_) => AppError::UnprocessableEntity(err.to_string()),
            EnrollmentError::Validation(msg) => AppError::BadRequest(msg),
            EnrollmentError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for EnrollmentError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}
