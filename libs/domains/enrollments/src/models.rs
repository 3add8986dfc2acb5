use chrono::{DateTime, Utc};
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Grade below which a completed enrollment is not approved.
pub const APPROVAL_THRESHOLD: f64 = 7.0;

/// Unlocked courses offered per approved completion.
pub const UNLOCKS_PER_APPROVAL: usize = 3;

/// Enrollment lifecycle status.
///
/// `Active` transitions exactly once to `Completed`; there are no other
/// transitions and no re-opening.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    Default,
    DeriveActiveEnum,
    EnumIter,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "enrollment_status")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Student is enrolled and working through the course
    #[default]
    #[sea_orm(string_value = "active")]
    Active,
    /// Course finished with a final grade (terminal)
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// A registered student.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    /// Unique registration code, e.g. "STU-2024-0042"
    pub enrollment_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for registering a student.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateStudent {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub enrollment_code: String,
}

impl Student {
    pub fn new(input: CreateStudent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: input.name,
            email: input.email,
            enrollment_code: input.enrollment_code,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A catalog course.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: Uuid,
    /// Unique course code, e.g. "JAVA001"
    pub code: String,
    pub name: String,
    pub description: String,
    /// Workload in hours
    pub workload: u32,
    /// Prerequisite course codes, informational only
    pub prerequisites: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a course to the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCourse {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 4000))]
    pub description: String,
    #[validate(range(min = 1, max = 1000))]
    pub workload: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl Course {
    pub fn new(input: CreateCourse) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            code: input.code,
            name: input.name,
            description: input.description,
            workload: input.workload,
            prerequisites: input.prerequisites,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The enrollment aggregate: one student in one course.
///
/// Status, grade and timestamps are mutated only through the service layer.
/// The grade is present iff the enrollment is completed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    pub grade: Option<f64>,
    pub enrolled_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    pub fn new(student_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            student_id,
            course_id,
            status: EnrollmentStatus::Active,
            grade: None,
            enrolled_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == EnrollmentStatus::Completed
    }

    /// Approval is derived, never stored: completed with grade >= 7.0.
    pub fn is_approved(&self) -> bool {
        self.status == EnrollmentStatus::Completed
            && self.grade.is_some_and(|g| g >= APPROVAL_THRESHOLD)
    }
}

/// Request body for enrolling a student in a course.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct EnrollStudent {
    pub student_id: Uuid,
    #[validate(length(min = 1, max = 64))]
    pub course_code: String,
}

/// Request body for completing an enrollment.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CompleteEnrollment {
    pub student_id: Uuid,
    #[validate(range(min = 0.0, max = 10.0))]
    pub grade: f64,
}
