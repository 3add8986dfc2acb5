//! HTTP endpoints for students, courses and enrollments.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_helpers::ErrorResponse;
use std::sync::Arc;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::error::EnrollmentResult;
use crate::models::{
    CompleteEnrollment, Course, CreateCourse, CreateStudent, EnrollStudent, Enrollment,
    EnrollmentStatus, Student,
};
use crate::publisher::CompletionPublisher;
use crate::repository::{CourseRepository, EnrollmentRepository, StudentRepository};
use crate::service::EnrollmentService;

const TAG: &str = "academy";

/// OpenAPI documentation for the academy API
#[derive(OpenApi)]
#[openapi(
    paths(
        register_student,
        list_students,
        get_student,
        create_course,
        list_courses,
        enroll,
        list_enrollments,
        complete_enrollment,
        unlocked_courses,
    ),
    components(schemas(
        Student,
        CreateStudent,
        Course,
        CreateCourse,
        Enrollment,
        EnrollmentStatus,
        EnrollStudent,
        CompleteEnrollment,
        ErrorResponse
    )),
    tags(
        (name = TAG, description = "Student enrollment and course unlocking")
    )
)]
pub struct ApiDoc;

/// Create the academy router with all HTTP endpoints
pub fn router<S, C, E, P>(service: EnrollmentService<S, C, E, P>) -> Router
where
    S: StudentRepository + 'static,
    C: CourseRepository + 'static,
    E: EnrollmentRepository + 'static,
    P: CompletionPublisher + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/students", post(register_student).get(list_students))
        .route("/students/{id}", get(get_student))
        .route("/students/{id}/enrollments", get(list_enrollments))
        .route("/students/{id}/unlocked-courses", get(unlocked_courses))
        .route("/courses", post(create_course).get(list_courses))
        .route("/enrollments", post(enroll))
        .route("/enrollments/{id}/complete", post(complete_enrollment))
        .with_state(shared_service)
}

type Service<S, C, E, P> = Arc<EnrollmentService<S, C, E, P>>;

/// Register a new student
#[utoipa::path(
    post,
    path = "/students",
    tag = TAG,
    request_body = CreateStudent,
    responses(
        (status = 201, description = "Student registered", body = Student),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Enrollment code already taken", body = ErrorResponse)
    )
)]
async fn register_student<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Json(input): Json<CreateStudent>,
) -> EnrollmentResult<(StatusCode, Json<Student>)>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    let student = service.register_student(input).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// List all students
#[utoipa::path(
    get,
    path = "/students",
    tag = TAG,
    responses(
        (status = 200, description = "All registered students", body = Vec<Student>)
    )
)]
async fn list_students<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
) -> EnrollmentResult<Json<Vec<Student>>>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    Ok(Json(service.list_students().await?))
}

/// Get a student by ID
#[utoipa::path(
    get,
    path = "/students/{id}",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found", body = ErrorResponse)
    )
)]
async fn get_student<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Path(id): Path<Uuid>,
) -> EnrollmentResult<Json<Student>>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    Ok(Json(service.get_student(id).await?))
}

/// Add a course to the catalog
#[utoipa::path(
    post,
    path = "/courses",
    tag = TAG,
    request_body = CreateCourse,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Course code already taken", body = ErrorResponse)
    )
)]
async fn create_course<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Json(input): Json<CreateCourse>,
) -> EnrollmentResult<(StatusCode, Json<Course>)>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    let course = service.create_course(input).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// List the course catalog
#[utoipa::path(
    get,
    path = "/courses",
    tag = TAG,
    responses(
        (status = 200, description = "Catalog in stable order", body = Vec<Course>)
    )
)]
async fn list_courses<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
) -> EnrollmentResult<Json<Vec<Course>>>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    Ok(Json(service.list_courses().await?))
}

/// Enroll a student in a course
#[utoipa::path(
    post,
    path = "/enrollments",
    tag = TAG,
    request_body = EnrollStudent,
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 404, description = "Student or course not found", body = ErrorResponse),
        (status = 409, description = "Already enrolled or completed", body = ErrorResponse)
    )
)]
async fn enroll<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Json(input): Json<EnrollStudent>,
) -> EnrollmentResult<(StatusCode, Json<Enrollment>)>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    let enrollment = service.enroll(input).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// List a student's enrollments
#[utoipa::path(
    get,
    path = "/students/{id}/enrollments",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "The student's enrollments", body = Vec<Enrollment>)
    )
)]
async fn list_enrollments<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Path(id): Path<Uuid>,
) -> EnrollmentResult<Json<Vec<Enrollment>>>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    Ok(Json(service.list_enrollments(id).await?))
}

/// Complete an enrollment with a final grade
#[utoipa::path(
    post,
    path = "/enrollments/{id}/complete",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Enrollment ID")),
    request_body = CompleteEnrollment,
    responses(
        (status = 200, description = "Enrollment completed", body = Enrollment),
        (status = 404, description = "Enrollment not found for student", body = ErrorResponse),
        (status = 409, description = "Enrollment already completed", body = ErrorResponse),
        (status = 422, description = "Grade out of range", body = ErrorResponse)
    )
)]
async fn complete_enrollment<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Path(id): Path<Uuid>,
    Json(input): Json<CompleteEnrollment>,
) -> EnrollmentResult<Json<Enrollment>>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    Ok(Json(service.complete(id, input).await?))
}

/// Courses unlocked for a student by approved completions
#[utoipa::path(
    get,
    path = "/students/{id}/unlocked-courses",
    tag = TAG,
    params(("id" = Uuid, Path, description = "Student ID")),
    responses(
        (status = 200, description = "Unlocked courses in catalog order", body = Vec<Course>)
    )
)]
async fn unlocked_courses<S, C, E, P>(
    State(service): State<Service<S, C, E, P>>,
    Path(id): Path<Uuid>,
) -> EnrollmentResult<Json<Vec<Course>>>
where
    S: StudentRepository,
    C: CourseRepository,
    E: EnrollmentRepository,
    P: CompletionPublisher,
{
    Ok(Json(service.unlocked_courses(id).await?))
}
