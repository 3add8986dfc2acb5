//! PostgreSQL repositories built on Sea-ORM.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::entity::{course, enrollment, student};
use crate::error::{EnrollmentError, EnrollmentResult};
use crate::models::{
    Course, CreateCourse, CreateStudent, Enrollment, EnrollmentStatus, Student,
};
use crate::repository::{CourseRepository, EnrollmentRepository, StudentRepository};

pub struct PgStudentRepository {
    db: DatabaseConnection,
}

impl PgStudentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    async fn create(&self, input: CreateStudent) -> EnrollmentResult<Student> {
        let exists = student::Entity::find()
            .filter(student::Column::EnrollmentCode.eq(&input.enrollment_code))
            .one(&self.db)
            .await?
            .is_some();

        if exists {
            return Err(EnrollmentError::DuplicateCode(input.enrollment_code));
        }

        let new = Student::new(input);
        let model = student::Entity::insert(student::ActiveModel::from(new.clone()))
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(student_id = %model.id, "Registered student");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Student>> {
        let model = student::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_code(&self, code: &str) -> EnrollmentResult<Option<Student>> {
        let model = student::Entity::find()
            .filter(student::Column::EnrollmentCode.eq(code))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self) -> EnrollmentResult<Vec<Student>> {
        let models = student::Entity::find()
            .order_by_asc(student::Column::Name)
            .order_by_asc(student::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

pub struct PgCourseRepository {
    db: DatabaseConnection,
}

impl PgCourseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CourseRepository for PgCourseRepository {
    async fn create(&self, input: CreateCourse) -> EnrollmentResult<Course> {
        let exists = course::Entity::find()
            .filter(course::Column::Code.eq(&input.code))
            .one(&self.db)
            .await?
            .is_some();

        if exists {
            return Err(EnrollmentError::DuplicateCode(input.code));
        }

        let new = Course::new(input);
        let model = course::Entity::insert(course::ActiveModel::from(new.clone()))
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(course_id = %model.id, code = %model.code, "Created course");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Course>> {
        let model = course::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_by_code(&self, code: &str) -> EnrollmentResult<Option<Course>> {
        let model = course::Entity::find()
            .filter(course::Column::Code.eq(code))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list(&self) -> EnrollmentResult<Vec<Course>> {
        let models = course::Entity::find()
            .order_by_asc(course::Column::Name)
            .order_by_asc(course::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }
}

pub struct PgEnrollmentRepository {
    db: DatabaseConnection,
}

impl PgEnrollmentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EnrollmentRepository for PgEnrollmentRepository {
    async fn create(&self, new: Enrollment) -> EnrollmentResult<Enrollment> {
        let model = enrollment::Entity::insert(enrollment::ActiveModel::from(new))
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(
            enrollment_id = %model.id,
            student_id = %model.student_id,
            "Created enrollment"
        );
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> EnrollmentResult<Option<Enrollment>> {
        let model = enrollment::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Into::into))
    }

    async fn get_for_student(
        &self,
        id: Uuid,
        student_id: Uuid,
    ) -> EnrollmentResult<Option<Enrollment>> {
        let model = enrollment::Entity::find_by_id(id)
            .filter(enrollment::Column::StudentId.eq(student_id))
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn exists_for_pair(&self, student_id: Uuid, course_id: Uuid) -> EnrollmentResult<bool> {
        let count = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::CourseId.eq(course_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn list_by_student(&self, student_id: Uuid) -> EnrollmentResult<Vec<Enrollment>> {
        let models = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .order_by_desc(enrollment::Column::EnrolledAt)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn find_recent_approved(
        &self,
        student_id: Uuid,
        limit: usize,
    ) -> EnrollmentResult<Vec<Enrollment>> {
        let models = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::Status.eq(EnrollmentStatus::Completed))
            .filter(enrollment::Column::Grade.gte(crate::models::APPROVAL_THRESHOLD))
            .order_by_desc(enrollment::Column::CompletedAt)
            .limit(limit as u64)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn complete(
        &self,
        id: Uuid,
        grade: f64,
        completed_at: DateTime<Utc>,
    ) -> EnrollmentResult<Option<Enrollment>> {
        // Conditional UPDATE on status = 'active' is the serialization point
        // for concurrent completions: only one caller gets rows_affected = 1.
        let result = enrollment::Entity::update_many()
            .col_expr(
                enrollment::Column::Status,
                Expr::value(EnrollmentStatus::Completed),
            )
            .col_expr(enrollment::Column::Grade, Expr::value(grade))
            .col_expr(
                enrollment::Column::CompletedAt,
                Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(completed_at)),
            )
            .filter(enrollment::Column::Id.eq(id))
            .filter(enrollment::Column::Status.eq(EnrollmentStatus::Active))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        tracing::info!(enrollment_id = %id, grade, "Completed enrollment");
        self.get_by_id(id).await
    }
}
