use std::collections::HashSet;
use std::sync::Arc;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::events::CourseCompletedEvent;
use crate::models::{
    CompleteEnrollment, Course, CreateCourse, CreateStudent, EnrollStudent, Enrollment, Student,
    UNLOCKS_PER_APPROVAL,
};
use crate::publisher::CompletionPublisher;
use crate::repository::{CourseRepository, EnrollmentRepository, StudentRepository};

/// Service layer for enrollment business logic.
///
/// Sole mutator of enrollment status, grade and timestamps.
#[derive(Clone)]
pub struct EnrollmentService<S, C, E, P>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    students: Arc<S>,
    courses: Arc<C>,
    enrollments: Arc<E>,
    publisher: Arc<P>,
}

impl<S, C, E, P> EnrollmentService<S, C, E, P>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    pub fn new(students: S, courses: C, enrollments: E, publisher: P) -> Self {
        Self {
            students: Arc::new(students),
            courses: Arc::new(courses),
            enrollments: Arc::new(enrollments),
            publisher: Arc::new(publisher),
        }
    }

    /// Register a new student.
    pub async fn register_student(&self, input: CreateStudent) -> EnrollmentResult<Student> {
        input
            .validate()
            .map_err(|e| EnrollmentError::Validation(e.to_string()))?;

        self.students.create(input).await
    }

    pub async fn get_student(&self, id: Uuid) -> EnrollmentResult<Student> {
        self.students
            .get_by_id(id)
            .await?
            .ok_or(EnrollmentError::StudentNotFound(id))
    }

    pub async fn list_students(&self) -> EnrollmentResult<Vec<Student>> {
        self.students.list().await
    }

    /// Add a course to the catalog.
    pub async fn create_course(&self, input: CreateCourse) -> EnrollmentResult<Course> {
        input
            .validate()
            .map_err(|e| EnrollmentError::Validation(e.to_string()))?;

        self.courses.create(input).await
    }

    pub async fn list_courses(&self) -> EnrollmentResult<Vec<Course>> {
        self.courses.list().await
    }

    /// Enroll a student in a course.
    ///
    /// Rejected if the pair already has an enrollment, active or completed:
    /// a course once touched cannot be taken again.
    pub async fn enroll(&self, input: EnrollStudent) -> EnrollmentResult<Enrollment> {
        input
            .validate()
            .map_err(|e| EnrollmentError::Validation(e.to_string()))?;

        let student = self.get_student(input.student_id).await?;

        let course = self
            .courses
            .get_by_code(&input.course_code)
            .await?
            .ok_or_else(|| EnrollmentError::CourseNotFound(input.course_code.clone()))?;

        if self
            .enrollments
            .exists_for_pair(student.id, course.id)
            .await?
        {
            return Err(EnrollmentError::AlreadyEnrolled {
                student_id: student.id,
                course_code: course.code,
            });
        }

        self.enrollments
            .create(Enrollment::new(student.id, course.id))
            .await
    }

    pub async fn list_enrollments(&self, student_id: Uuid) -> EnrollmentResult<Vec<Enrollment>> {
        self.enrollments.list_by_student(student_id).await
    }

    /// Complete an active enrollment with a final grade.
    ///
    /// On success a completion event is published to the completion stream.
    /// The publish is fire-and-forget: any error is logged and swallowed so
    /// the completion itself can never be failed by the messaging subsystem.
    pub async fn complete(
        &self,
        enrollment_id: Uuid,
        input: CompleteEnrollment,
    ) -> EnrollmentResult<Enrollment> {
        if !(0.0..=10.0).contains(&input.grade) {
            return Err(EnrollmentError::InvalidGrade(input.grade));
        }

        let enrollment = self
            .enrollments
            .get_for_student(enrollment_id, input.student_id)
            .await?
            .ok_or(EnrollmentError::EnrollmentNotFound(enrollment_id))?;

        if enrollment.is_completed() {
            return Err(EnrollmentError::AlreadyCompleted(enrollment_id));
        }

        let student = self.get_student(enrollment.student_id).await?;
        let course = self
            .courses
            .get_by_id(enrollment.course_id)
            .await?
            .ok_or_else(|| EnrollmentError::CourseNotFound(enrollment.course_id.to_string()))?;

        // The conditional update is the serialization point: a concurrent
        // completion that lost the race sees None here, never an overwrite.
        let completed = self
            .enrollments
            .complete(enrollment_id, input.grade, Utc::now())
            .await?
            .ok_or(EnrollmentError::AlreadyCompleted(enrollment_id))?;

        let event = CourseCompletedEvent::new(&student, &course, &completed);
        if let Err(e) = self.publisher.publish(&event).await {
            warn!(
                event_id = %event.event_id,
                enrollment_id = %enrollment_id,
                error = %e,
                "Failed to publish completion event, continuing"
            );
        }

        Ok(completed)
    }

    /// Courses unlocked for a student, proportional to approved completions.
    ///
    /// Selection algorithm:
    /// 1. Count approved completions (completed with grade >= 7.0).
    /// 2. Zero approvals unlock nothing.
    /// 3. Otherwise offer up to `approved * 3` catalog courses, in catalog
    ///    order (name, then id), skipping every course the student has any
    ///    enrollment for.
    ///
    /// Pure and re-evaluated on every call.
    pub async fn unlocked_courses(&self, student_id: Uuid) -> EnrollmentResult<Vec<Course>> {
        let enrollments = self.enrollments.list_by_student(student_id).await?;

        let approved_count = enrollments.iter().filter(|e| e.is_approved()).count();
        if approved_count == 0 {
            return Ok(vec![]);
        }

        let limit = approved_count.saturating_mul(UNLOCKS_PER_APPROVAL);
        let touched: HashSet<Uuid> = enrollments.iter().map(|e| e.course_id).collect();

        let catalog = self.courses.list().await?;
        Ok(catalog
            .into_iter()
            .filter(|c| !touched.contains(&c.id))
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::MockCompletionPublisher;
    use crate::repository::{
        InMemoryCourseRepository, InMemoryEnrollmentRepository, InMemoryStudentRepository,
    };
    use stream_worker::StreamError;

    type TestService = EnrollmentService<
        InMemoryStudentRepository,
        InMemoryCourseRepository,
        InMemoryEnrollmentRepository,
        MockCompletionPublisher,
    >;

    fn service_with_publisher(publisher: MockCompletionPublisher) -> TestService {
        EnrollmentService::new(
            InMemoryStudentRepository::new(),
            InMemoryCourseRepository::new(),
            InMemoryEnrollmentRepository::new(),
            publisher,
        )
    }

    fn service() -> TestService {
        let mut publisher = MockCompletionPublisher::new();
        publisher.expect_publish().returning(|_| Ok(()));
        service_with_publisher(publisher)
    }

    async fn register_student(svc: &TestService) -> Student {
        svc.register_student(CreateStudent {
            name: "Grace".to_string(),
            email: "grace@example.com".to_string(),
            enrollment_code: "STU-0001".to_string(),
        })
        .await
        .unwrap()
    }

    async fn add_course(svc: &TestService, code: &str, name: &str) -> Course {
        svc.create_course(CreateCourse {
            code: code.to_string(),
            name: name.to_string(),
            description: "A course".to_string(),
            workload: 40,
            prerequisites: vec![],
        })
        .await
        .unwrap()
    }

    async fn seed_catalog(svc: &TestService, count: usize) -> Vec<Course> {
        let mut courses = Vec::new();
        for i in 0..count {
            courses.push(add_course(svc, &format!("C{i:03}"), &format!("Course {i:03}")).await);
        }
        courses
    }

    async fn enroll_and_complete(svc: &TestService, student: &Student, code: &str, grade: f64) {
        let enrollment = svc
            .enroll(EnrollStudent {
                student_id: student.id,
                course_code: code.to_string(),
            })
            .await
            .unwrap();
        svc.complete(
            enrollment.id,
            CompleteEnrollment {
                student_id: student.id,
                grade,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_enroll_rejects_unknown_student_and_course() {
        let svc = service();
        let student = register_student(&svc).await;
        add_course(&svc, "JAVA001", "Java Basics").await;

        let result = svc
            .enroll(EnrollStudent {
                student_id: Uuid::now_v7(),
                course_code: "JAVA001".to_string(),
            })
            .await;
        assert!(matches!(result, Err(EnrollmentError::StudentNotFound(_))));

        let result = svc
            .enroll(EnrollStudent {
                student_id: student.id,
                course_code: "NOPE".to_string(),
            })
            .await;
        assert!(matches!(result, Err(EnrollmentError::CourseNotFound(_))));
    }

    #[tokio::test]
    async fn test_enroll_rejects_duplicate_pair() {
        let svc = service();
        let student = register_student(&svc).await;
        add_course(&svc, "JAVA001", "Java Basics").await;

        let input = EnrollStudent {
            student_id: student.id,
            course_code: "JAVA001".to_string(),
        };
        svc.enroll(input.clone()).await.unwrap();

        let result = svc.enroll(input.clone()).await;
        assert!(matches!(result, Err(EnrollmentError::AlreadyEnrolled { .. })));

        // Completing the course does not make the pair enrollable again
        enroll_and_complete(&svc, &register_student_2(&svc).await, "JAVA001", 9.0).await;
        let result = svc.enroll(input).await;
        assert!(matches!(result, Err(EnrollmentError::AlreadyEnrolled { .. })));
    }

    async fn register_student_2(svc: &TestService) -> Student {
        svc.register_student(CreateStudent {
            name: "Alan".to_string(),
            email: "alan@example.com".to_string(),
            enrollment_code: "STU-0002".to_string(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_rejects_out_of_range_grades() {
        let svc = service();
        let student = register_student(&svc).await;
        add_course(&svc, "JAVA001", "Java Basics").await;
        let enrollment = svc
            .enroll(EnrollStudent {
                student_id: student.id,
                course_code: "JAVA001".to_string(),
            })
            .await
            .unwrap();

        for bad in [-0.01, 10.01] {
            let result = svc
                .complete(
                    enrollment.id,
                    CompleteEnrollment {
                        student_id: student.id,
                        grade: bad,
                    },
                )
                .await;
            assert!(
                matches!(result, Err(EnrollmentError::InvalidGrade(_))),
                "grade {bad} should be rejected"
            );
        }

        // Boundary values are accepted
        let completed = svc
            .complete(
                enrollment.id,
                CompleteEnrollment {
                    student_id: student.id,
                    grade: 0.0,
                },
            )
            .await
            .unwrap();
        assert!(completed.is_completed());
        assert!(!completed.is_approved());
    }

    #[tokio::test]
    async fn test_complete_is_idempotent_rejecting() {
        let svc = service();
        let student = register_student(&svc).await;
        add_course(&svc, "JAVA001", "Java Basics").await;
        let enrollment = svc
            .enroll(EnrollStudent {
                student_id: student.id,
                course_code: "JAVA001".to_string(),
            })
            .await
            .unwrap();

        svc.complete(
            enrollment.id,
            CompleteEnrollment {
                student_id: student.id,
                grade: 10.0,
            },
        )
        .await
        .unwrap();

        let result = svc
            .complete(
                enrollment.id,
                CompleteEnrollment {
                    student_id: student.id,
                    grade: 5.0,
                },
            )
            .await;
        assert!(matches!(result, Err(EnrollmentError::AlreadyCompleted(_))));

        // Grade and timestamp were not overwritten by the rejected call
        let stored = &svc.list_enrollments(student.id).await.unwrap()[0];
        assert_eq!(stored.grade, Some(10.0));
    }

    #[tokio::test]
    async fn test_complete_succeeds_when_publish_fails() {
        let mut publisher = MockCompletionPublisher::new();
        publisher
            .expect_publish()
            .returning(|_| Err(StreamError::transient("broker unreachable")));
        let svc = service_with_publisher(publisher);

        let student = register_student(&svc).await;
        add_course(&svc, "JAVA001", "Java Basics").await;
        let enrollment = svc
            .enroll(EnrollStudent {
                student_id: student.id,
                course_code: "JAVA001".to_string(),
            })
            .await
            .unwrap();

        let completed = svc
            .complete(
                enrollment.id,
                CompleteEnrollment {
                    student_id: student.id,
                    grade: 8.0,
                },
            )
            .await
            .unwrap();

        assert!(completed.is_completed());
        assert_eq!(completed.grade, Some(8.0));
    }

    #[tokio::test]
    async fn test_publish_carries_approval_flag() {
        let mut publisher = MockCompletionPublisher::new();
        publisher
            .expect_publish()
            .withf(|event| event.approved && event.final_grade == 7.0)
            .times(1)
            .returning(|_| Ok(()));
        let svc = service_with_publisher(publisher);

        let student = register_student(&svc).await;
        add_course(&svc, "JAVA001", "Java Basics").await;
        enroll_and_complete(&svc, &student, "JAVA001", 7.0).await;
    }

    #[tokio::test]
    async fn test_unlocked_empty_without_approvals() {
        let svc = service();
        let student = register_student(&svc).await;
        seed_catalog(&svc, 10).await;

        assert!(svc.unlocked_courses(student.id).await.unwrap().is_empty());

        // A failing grade still unlocks nothing
        enroll_and_complete(&svc, &student, "C000", 6.9).await;
        assert!(svc.unlocked_courses(student.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unlocked_proportional_to_approvals() {
        let svc = service();
        let student = register_student(&svc).await;
        seed_catalog(&svc, 12).await;

        enroll_and_complete(&svc, &student, "C000", 8.0).await;
        let unlocked = svc.unlocked_courses(student.id).await.unwrap();
        assert_eq!(unlocked.len(), 3);

        enroll_and_complete(&svc, &student, "C001", 9.5).await;
        let unlocked = svc.unlocked_courses(student.id).await.unwrap();
        assert_eq!(unlocked.len(), 6);

        // Distinct, in catalog order, excluding everything touched
        let codes: HashSet<&str> = unlocked.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes.len(), 6);
        assert!(!codes.contains("C000"));
        assert!(!codes.contains("C001"));
    }

    #[tokio::test]
    async fn test_unlocked_excludes_touched_and_stays_proportional() {
        let svc = service();
        let student = register_student(&svc).await;
        seed_catalog(&svc, 10).await;
        add_course(&svc, "JAVA001", "Java Basics").await;

        enroll_and_complete(&svc, &student, "JAVA001", 10.0).await;

        let unlocked = svc.unlocked_courses(student.id).await.unwrap();
        assert_eq!(unlocked.len(), 3);
        assert!(unlocked.iter().all(|c| c.code != "JAVA001"));

        // Enrolling in an unlocked course without completing it keeps the
        // count at 3 but removes that course from the offer
        let picked = unlocked[0].code.clone();
        svc.enroll(EnrollStudent {
            student_id: student.id,
            course_code: picked.clone(),
        })
        .await
        .unwrap();

        let unlocked = svc.unlocked_courses(student.id).await.unwrap();
        assert_eq!(unlocked.len(), 3);
        assert!(unlocked.iter().all(|c| c.code != picked));
    }

    #[tokio::test]
    async fn test_unlocked_shrinks_when_catalog_exhausted() {
        let svc = service();
        let student = register_student(&svc).await;
        seed_catalog(&svc, 3).await;

        enroll_and_complete(&svc, &student, "C000", 9.0).await;

        // limit is 3 but only 2 untouched courses remain
        let unlocked = svc.unlocked_courses(student.id).await.unwrap();
        assert_eq!(unlocked.len(), 2);
    }
}
