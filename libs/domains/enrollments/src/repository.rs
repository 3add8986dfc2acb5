use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::{Course, CreateCourse, CreateStudent, Enrollment, EnrollmentStatus, Student};

/// Repository trait for Student persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create(&self, input: CreateStudent) -> EnrollmentResult<Student>;

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Student>>;

    async fn get_by_code(&self, code: &str) -> EnrollmentResult<Option<Student>>;

    async fn list(&self) -> EnrollmentResult<Vec<Student>>;
}

/// Repository trait for the course catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, input: CreateCourse) -> EnrollmentResult<Course>;

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Course>>;

    async fn get_by_code(&self, code: &str) -> EnrollmentResult<Option<Course>>;

    /// List the full catalog in stable order: by name, then by id.
    async fn list(&self) -> EnrollmentResult<Vec<Course>>;
}

/// Repository trait for Enrollment persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn create(&self, enrollment: Enrollment) -> EnrollmentResult<Enrollment>;

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Enrollment>>;

    /// Find an enrollment by id scoped to a student.
    async fn get_for_student(
        &self,
        id: Uuid,
        student_id: Uuid,
    ) -> EnrollmentResult<Option<Enrollment>>;

    /// Whether the student has ANY enrollment (active or completed) for the course.
    async fn exists_for_pair(&self, student_id: Uuid, course_id: Uuid) -> EnrollmentResult<bool>;

    /// All enrollments for a student.
    async fn list_by_student(&self, student_id: Uuid) -> EnrollmentResult<Vec<Enrollment>>;

    /// Most recent approved completions for a student, newest first.
    async fn find_recent_approved(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> EnrollmentResult<Vec<Enrollment>>;

    /// Mark an active enrollment completed with the given grade.
    ///
    /// The update is conditional on the row still being active: returns
    /// `None` if the enrollment was already terminal, which is how a lost
    /// race between two concurrent completions is detected.
    async fn complete(
        &self,
        id: Uuid,
        grade: f64,
        completed_at: DateTime<Utc>,
    ) -> EnrollmentResult<Option<Enrollment>>;
}

/// In-memory implementation of StudentRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryStudentRepository {
    students: Arc<RwLock<HashMap<Uuid, Student>>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn create(&self, input: CreateStudent) -> EnrollmentResult<Student> {
        let mut students = self.students.write().await;

        if students
            .values()
            .any(|s| s.enrollment_code == input.enrollment_code)
        {
            return Err(EnrollmentError::DuplicateCode(input.enrollment_code));
        }

        let student = Student::new(input);
        students.insert(student.id, student.clone());

        tracing::info!(student_id = %student.id, "Registered student");
        Ok(student)
    }

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Student>> {
        let students = self.students.read().await;
        Ok(students.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> EnrollmentResult<Option<Student>> {
        let students = self.students.read().await;
        Ok(students.values().find(|s| s.enrollment_code == code).cloned())
    }

    async fn list(&self) -> EnrollmentResult<Vec<Student>> {
        let students = self.students.read().await;
        let mut result: Vec<Student> = students.values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(result)
    }
}

/// In-memory implementation of CourseRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryCourseRepository {
    courses: Arc<RwLock<HashMap<Uuid, Course>>>,
}

impl InMemoryCourseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn create(&self, input: CreateCourse) -> EnrollmentResult<Course> {
        let mut courses = self.courses.write().await;

        if courses.values().any(|c| c.code == input.code) {
            return Err(EnrollmentError::DuplicateCode(input.code));
        }

        let course = Course::new(input);
        courses.insert(course.id, course.clone());

        tracing::info!(course_id = %course.id, code = %course.code, "Created course");
        Ok(course)
    }

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.get(&id).cloned())
    }

    async fn get_by_code(&self, code: &str) -> EnrollmentResult<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.values().find(|c| c.code == code).cloned())
    }

    async fn list(&self) -> EnrollmentResult<Vec<Course>> {
        let courses = self.courses.read().await;
        let mut result: Vec<Course> = courses.values().cloned().collect();
        result.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(result)
    }
}

/// In-memory implementation of EnrollmentRepository (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Arc<RwLock<HashMap<Uuid, Enrollment>>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn create(&self, enrollment: Enrollment) -> EnrollmentResult<Enrollment> {
        let mut enrollments = self.enrollments.write().await;
        enrollments.insert(enrollment.id, enrollment.clone());

        tracing::info!(
            enrollment_id = %enrollment.id,
            student_id = %enrollment.student_id,
            "Created enrollment"
        );
        Ok(enrollment)
    }

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments.get(&id).cloned())
    }

    async fn get_for_student(
        &self,
        id: Uuid,
        student_id: Uuid,
    ) -> EnrollmentResult<Option<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .get(&id)
            .filter(|e| e.student_id == student_id)
            .cloned())
    }

    async fn exists_for_pair(&self, student_id: Uuid, course_id: Uuid) -> EnrollmentResult<bool> {
        let enrollments = self.enrollments.read().await;
        Ok(enrollments
            .values()
            .any(|e| e.student_id == student_id && e.course_id == course_id))
    }

    async fn list_by_student(&self, student_id: Uuid) -> EnrollmentResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        let mut result: Vec<Enrollment> = enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(result)
    }

    async fn find_recent_approved(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> EnrollmentResult<Vec<Enrollment>> {
        let enrollments = self.enrollments.read().await;
        let mut result: Vec<Enrollment> = enrollments
            .values()
            .filter(|e| e.student_id == student_id && e.is_approved())
            .cloned()
            .collect();
        result.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        result.truncate(limit);
        Ok(result)
    }

    async fn complete(
        &self,
        id: Uuid,
        grade: f64,
        completed_at: DateTime<Utc>,
    ) -> EnrollmentResult<Option<Enrollment>> {
        let mut enrollments = self.enrollments.write().await;

        let Some(enrollment) = enrollments.get_mut(&id) else {
            return Ok(None);
        };

        // The write lock serializes concurrent completions; only the first
        // caller sees the enrollment still active.
        if enrollment.status != EnrollmentStatus::Active {
            return Ok(None);
        }

        enrollment.status = EnrollmentStatus::Completed;
        enrollment.grade = Some(grade);
        enrollment.completed_at = Some(completed_at);

        tracing::info!(enrollment_id = %id, grade, "Completed enrollment");
        Ok(Some(enrollment.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, name: &str) -> CreateCourse {
        CreateCourse {
            code: code.to_string(),
            name: name.to_string(),
            description: String::new(),
            workload: 40,
            prerequisites: vec![],
        }
    }

    #[tokio::test]
    async fn test_catalog_ordered_by_name() {
        let repo = InMemoryCourseRepository::new();
        repo.create(course("C3", "Zig")).await.unwrap();
        repo.create(course("C1", "Ada")).await.unwrap();
        repo.create(course("C2", "Ml")).await.unwrap();

        let catalog = repo.list().await.unwrap();
        let names: Vec<&str> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Ml", "Zig"]);
    }

    #[tokio::test]
    async fn test_duplicate_course_code_rejected() {
        let repo = InMemoryCourseRepository::new();
        repo.create(course("C1", "Ada")).await.unwrap();

        let result = repo.create(course("C1", "Ada again")).await;
        assert!(matches!(result, Err(EnrollmentError::DuplicateCode(_))));
    }

    #[tokio::test]
    async fn test_complete_is_conditional_on_active_status() {
        let repo = InMemoryEnrollmentRepository::new();
        let enrollment = Enrollment::new(Uuid::now_v7(), Uuid::now_v7());
        let id = enrollment.id;
        repo.create(enrollment).await.unwrap();

        let first = repo.complete(id, 9.0, Utc::now()).await.unwrap();
        assert!(first.is_some());
        assert_eq!(first.unwrap().grade, Some(9.0));

        // Second completion loses the race and must not overwrite
        let second = repo.complete(id, 5.0, Utc::now()).await.unwrap();
        assert!(second.is_none());

        let stored = repo.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.grade, Some(9.0));
    }

    #[tokio::test]
    async fn test_recent_approved_excludes_failed_and_active() {
        let repo = InMemoryEnrollmentRepository::new();
        let student_id = Uuid::now_v7();

        let approved = Enrollment::new(student_id, Uuid::now_v7());
        let approved_id = approved.id;
        repo.create(approved).await.unwrap();
        repo.complete(approved_id, 8.0, Utc::now()).await.unwrap();

        let failed = Enrollment::new(student_id, Uuid::now_v7());
        let failed_id = failed.id;
        repo.create(failed).await.unwrap();
        repo.complete(failed_id, 5.0, Utc::now()).await.unwrap();

        repo.create(Enrollment::new(student_id, Uuid::now_v7()))
            .await
            .unwrap();

        let recent = repo.find_recent_approved(student_id, 3).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, approved_id);
    }
}
