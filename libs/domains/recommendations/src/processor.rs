//! The recommendation stage of the completion pipeline.

use async_trait::async_trait;
use domain_enrollments::events::CourseCompletedEvent;
use domain_enrollments::repository::{CourseRepository, EnrollmentRepository};
use domain_enrollments::Course;
use domain_notifications::NotificationEvent;
use std::collections::HashSet;
use std::sync::Arc;
use stream_worker::{StreamError, StreamProcessor};
use tracing::info;
use uuid::Uuid;

use crate::error::{RecommendationError, RecommendationResult};
use crate::generator::{GenerationContext, RecommendationGenerator};
use crate::publisher::NotificationPublisher;

/// How many recent approved completions feed the generator.
const RECENT_COMPLETIONS: usize = 3;

/// Consumes completion events, generates a personalized recommendation and
/// emits a notification event for the email stage.
///
/// Every failure propagates to the worker: redelivery and dead-lettering is
/// the correctness mechanism here, so nothing is swallowed locally. The
/// generator's internal fallback is the only recovery on this path.
pub struct RecommendationProcessor<E, C, P>
where
    E: EnrollmentRepository,
    C: CourseRepository,
    P: NotificationPublisher,
{
    enrollments: Arc<E>,
    courses: Arc<C>,
    generator: RecommendationGenerator,
    publisher: Arc<P>,
}

impl<E, C, P> RecommendationProcessor<E, C, P>
where
    E: EnrollmentRepository,
    C: CourseRepository,
    P: NotificationPublisher,
{
    pub fn new(enrollments: E, courses: C, generator: RecommendationGenerator, publisher: P) -> Self {
        Self {
            enrollments: Arc::new(enrollments),
            courses: Arc::new(courses),
            generator,
            publisher: Arc::new(publisher),
        }
    }

    async fn handle(&self, event: &CourseCompletedEvent) -> RecommendationResult<()> {
        let recent = self
            .enrollments
            .find_recent_approved(event.student_id, RECENT_COMPLETIONS)
            .await
            .map_err(RecommendationError::DataAccess)?;

        let mut recent_completions = Vec::with_capacity(recent.len());
        for enrollment in &recent {
            if let Some(course) = self
                .courses
                .get_by_id(enrollment.course_id)
                .await
                .map_err(RecommendationError::DataAccess)?
            {
                recent_completions.push(course.name);
            }
        }

        let candidates = self.candidate_courses(event.student_id).await?;

        let ctx = GenerationContext {
            student_name: event.student_name.clone(),
            completed_course_name: event.course_name.clone(),
            grade: event.final_grade,
            recent_completions,
            candidates,
        };
        let body = self.generator.generate(&ctx).await;

        let notification = NotificationEvent::new(
            event.student_email.clone(),
            event.student_name.clone(),
            format!("Congratulations on completing {}!", event.course_name),
            body,
            event.student_id,
            event.course_id,
        );
        self.publisher.publish(&notification).await?;

        info!(
            event_id = %event.event_id,
            student_id = %event.student_id,
            notification_id = %notification.event_id,
            "Recommendation generated"
        );
        Ok(())
    }

    /// Catalog courses the student has no enrollment for, in catalog order.
    async fn candidate_courses(&self, student_id: Uuid) -> RecommendationResult<Vec<Course>> {
        let enrollments = self
            .enrollments
            .list_by_student(student_id)
            .await
            .map_err(RecommendationError::DataAccess)?;
        let touched: HashSet<Uuid> = enrollments.iter().map(|e| e.course_id).collect();

        let catalog = self
            .courses
            .list()
            .await
            .map_err(RecommendationError::DataAccess)?;
        Ok(catalog
            .into_iter()
            .filter(|c| !touched.contains(&c.id))
            .collect())
    }
}

#[async_trait]
impl<E, C, P> StreamProcessor<CourseCompletedEvent> for RecommendationProcessor<E, C, P>
where
    E: EnrollmentRepository,
    C: CourseRepository,
    P: NotificationPublisher,
{
    async fn process(&self, event: &CourseCompletedEvent) -> Result<(), StreamError> {
        self.handle(event).await.map_err(Into::into)
    }

    fn name(&self) -> &'static str {
        "recommendation_processor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::MockNotificationPublisher;
    use chrono::Utc;
    use domain_enrollments::models::{CreateCourse, CreateStudent, Enrollment, Student};
    use domain_enrollments::repository::{
        InMemoryCourseRepository, InMemoryEnrollmentRepository,
    };
    use domain_enrollments::repository::{CourseRepository as _, EnrollmentRepository as _};

    struct Fixture {
        student: Student,
        courses: InMemoryCourseRepository,
        enrollments: InMemoryEnrollmentRepository,
        completed_course: Course,
    }

    async fn fixture() -> Fixture {
        let student = Student::new(CreateStudent {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            enrollment_code: "STU-0001".to_string(),
        });

        let courses = InMemoryCourseRepository::new();
        let completed_course = courses
            .create(CreateCourse {
                code: "RUST101".to_string(),
                name: "Intro to Rust".to_string(),
                description: "Ownership and borrowing".to_string(),
                workload: 40,
                prerequisites: vec![],
            })
            .await
            .unwrap();
        for i in 0..3 {
            courses
                .create(CreateCourse {
                    code: format!("C{i:03}"),
                    name: format!("Course {i:03}"),
                    description: "More learning".to_string(),
                    workload: 40,
                    prerequisites: vec![],
                })
                .await
                .unwrap();
        }

        let enrollments = InMemoryEnrollmentRepository::new();
        let enrollment = enrollments
            .create(Enrollment::new(student.id, completed_course.id))
            .await
            .unwrap();
        enrollments
            .complete(enrollment.id, 9.5, Utc::now())
            .await
            .unwrap();

        Fixture {
            student,
            courses,
            enrollments,
            completed_course,
        }
    }

    fn completion_event(fixture: &Fixture) -> CourseCompletedEvent {
        let enrollment = Enrollment {
            id: Uuid::now_v7(),
            student_id: fixture.student.id,
            course_id: fixture.completed_course.id,
            status: domain_enrollments::EnrollmentStatus::Completed,
            grade: Some(9.5),
            enrolled_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };
        CourseCompletedEvent::new(&fixture.student, &fixture.completed_course, &enrollment)
    }

    #[tokio::test]
    async fn test_emits_notification_for_completion() {
        let fixture = fixture().await;
        let event = completion_event(&fixture);

        let mut publisher = MockNotificationPublisher::new();
        publisher
            .expect_publish()
            .withf(|n: &NotificationEvent| {
                n.recipient_email == "ada@example.com"
                    && n.subject.contains("Intro to Rust")
                    && !n.body.is_empty()
            })
            .times(1)
            .returning(|_| Ok(()));

        let processor = RecommendationProcessor::new(
            fixture.enrollments,
            fixture.courses,
            RecommendationGenerator::without_client(),
            publisher,
        );

        assert!(processor.process(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_candidates_exclude_touched_courses() {
        let fixture = fixture().await;
        let event = completion_event(&fixture);

        let mut publisher = MockNotificationPublisher::new();
        publisher
            .expect_publish()
            // Fallback recommends the first candidate in catalog order, which
            // must not be the completed course
            .withf(|n: &NotificationEvent| {
                n.body.contains("We think \"Course 000\"") && !n.body.contains("We think \"Intro to Rust\"")
            })
            .times(1)
            .returning(|_| Ok(()));

        let processor = RecommendationProcessor::new(
            fixture.enrollments,
            fixture.courses,
            RecommendationGenerator::without_client(),
            publisher,
        );

        assert!(processor.process(&event).await.is_ok());
    }

    #[tokio::test]
    async fn test_publish_failure_propagates() {
        let fixture = fixture().await;
        let event = completion_event(&fixture);

        let mut publisher = MockNotificationPublisher::new();
        publisher
            .expect_publish()
            .returning(|_| Err(StreamError::transient("broker unreachable")));

        let processor = RecommendationProcessor::new(
            fixture.enrollments,
            fixture.courses,
            RecommendationGenerator::without_client(),
            publisher,
        );

        let result = processor.process(&event).await;
        assert!(result.is_err());
    }
}
