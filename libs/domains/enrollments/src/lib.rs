//! Enrollments Domain
//!
//! Student course enrollment, completion grading and course unlocking.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Handlers   │  ← HTTP endpoints
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │   Service   │  ← Enrollment state machine, unlock algorithm
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐      ┌─────────────┐
//! │ Repository  │      │  Publisher  │  ← Completion events to Redis
//! └──────┬──────┘      └─────────────┘
//!        │
//! ┌──────▼──────┐
//! │   Models    │  ← Entities, DTOs, enums
//! └─────────────┘
//! ```
//!
//! Completing an enrollment publishes a [`events::CourseCompletedEvent`] to
//! the completion stream; the publish is fire-and-forget and can never fail
//! the completion itself.

pub mod entity;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod publisher;
pub mod repository;
pub mod service;
pub mod streams;

// Re-export commonly used types
pub use error::{EnrollmentError, EnrollmentResult};
pub use events::CourseCompletedEvent;
pub use models::{
    APPROVAL_THRESHOLD, CompleteEnrollment, Course, CreateCourse, CreateStudent, EnrollStudent,
    Enrollment, EnrollmentStatus, Student, UNLOCKS_PER_APPROVAL,
};
pub use postgres::{PgCourseRepository, PgEnrollmentRepository, PgStudentRepository};
pub use publisher::{CompletionPublisher, StreamCompletionPublisher};
pub use repository::{
    CourseRepository, EnrollmentRepository, InMemoryCourseRepository,
    InMemoryEnrollmentRepository, InMemoryStudentRepository, StudentRepository,
};
pub use service::EnrollmentService;
pub use streams::CompletionStream;
