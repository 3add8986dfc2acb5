//! The course completion event published when an enrollment turns terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stream_worker::StreamJob;
use uuid::Uuid;

use crate::models::{Course, Enrollment, Student};

/// Immutable fact: a student completed a course with a final grade.
///
/// Carries everything the downstream recommendation stage needs so it does
/// not have to look the student or course up again for addressing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseCompletedEvent {
    pub event_id: Uuid,
    pub student_id: Uuid,
    pub student_name: String,
    pub student_email: String,
    pub course_id: Uuid,
    pub course_name: String,
    pub course_code: String,
    pub final_grade: f64,
    /// Derived at completion time: grade >= 7.0
    pub approved: bool,
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
}

impl CourseCompletedEvent {
    pub fn new(student: &Student, course: &Course, enrollment: &Enrollment) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            student_id: student.id,
            student_name: student.name.clone(),
            student_email: student.email.clone(),
            course_id: course.id,
            course_name: course.name.clone(),
            course_code: course.code.clone(),
            final_grade: enrollment.grade.unwrap_or_default(),
            approved: enrollment.is_approved(),
            completed_at: enrollment.completed_at.unwrap_or_else(Utc::now),
            retry_count: 0,
        }
    }
}

impl StreamJob for CourseCompletedEvent {
    fn job_id(&self) -> String {
        self.event_id.to_string()
    }

    fn retry_count(&self) -> u32 {
        self.retry_count
    }

    fn with_retry(&self) -> Self {
        let mut event = self.clone();
        event.retry_count += 1;
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateCourse, CreateStudent, EnrollmentStatus};

    #[test]
    fn test_event_carries_derived_approval() {
        let student = Student::new(CreateStudent {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            enrollment_code: "STU-0001".to_string(),
        });
        let course = Course::new(CreateCourse {
            code: "RUST101".to_string(),
            name: "Intro to Rust".to_string(),
            description: "Ownership and borrowing".to_string(),
            workload: 40,
            prerequisites: vec![],
        });

        let mut enrollment = Enrollment::new(student.id, course.id);
        enrollment.status = EnrollmentStatus::Completed;
        enrollment.grade = Some(8.5);
        enrollment.completed_at = Some(Utc::now());

        let event = CourseCompletedEvent::new(&student, &course, &enrollment);
        assert!(event.approved);
        assert_eq!(event.final_grade, 8.5);
        assert_eq!(event.student_email, "ada@example.com");
        assert_eq!(event.course_code, "RUST101");
        assert_eq!(event.retry_count, 0);
    }

    #[test]
    fn test_retry_count_defaults_on_old_payloads() {
        // Payloads enqueued before the retry_count field existed still parse
        let json = r#"{
            "event_id": "0198c0de-0000-7000-8000-000000000001",
            "student_id": "0198c0de-0000-7000-8000-000000000002",
            "student_name": "Ada",
            "student_email": "ada@example.com",
            "course_id": "0198c0de-0000-7000-8000-000000000003",
            "course_name": "Intro to Rust",
            "course_code": "RUST101",
            "final_grade": 9.0,
            "approved": true,
            "completed_at": "2024-06-01T12:00:00Z"
        }"#;

        let event: CourseCompletedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.retry_count(), 0);
        assert_eq!(event.with_retry().retry_count(), 1);
    }
}
