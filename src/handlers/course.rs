// src/handlers/course.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        course::{Course, CourseDetail, CreateCourseRequest, InstructorStats, NewCourse},
        user::{Actor, Role},
    },
    services::export::{self, ArchiveDownload, FileResolver},
    state::DynStore,
    store::StoreError,
};

/// Creates a course owned by the calling instructor.
/// The course code is upper-cased and must be unique.
#[utoipa::path(
    post,
    path = "/api/courses",
    tag = "courses",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "Invalid input or duplicate course code"),
        (status = 401, description = "Students cannot create courses")
    ),
    security(("bearer" = []))
)]
pub async fn create_course(
    State(store): State<DynStore>,
    actor: Actor,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    if actor.role == Role::Student {
        return Err(AppError::AuthError(
            "Only instructors can create courses".to_string(),
        ));
    }

    let payload: CreateCourseRequest = serde_json::from_value(body)?;
    payload.validate()?;

    let course = store
        .create_course(NewCourse::from_request(payload, actor.id))
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => {
                AppError::Conflict("Course code already exists".to_string())
            }
            other => other.into(),
        })?;

    tracing::info!(
        course_id = course.id,
        course_code = %course.course_code,
        instructor_id = actor.id,
        "Course created"
    );

    Ok((StatusCode::CREATED, Json(course)))
}

/// Course and distinct-student counts for the calling instructor.
#[utoipa::path(
    get,
    path = "/api/courses/stats",
    tag = "courses",
    responses(
        (status = 200, description = "Instructor dashboard counts", body = InstructorStats),
        (status = 401, description = "Students have no teaching stats")
    ),
    security(("bearer" = []))
)]
pub async fn get_instructor_stats(
    State(store): State<DynStore>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    if actor.role == Role::Student {
        return Err(AppError::AuthError(
            "Only instructors have teaching stats".to_string(),
        ));
    }

    let stats = InstructorStats {
        active_classes: store.count_instructor_courses(actor.id).await?,
        total_students: store.count_distinct_students(actor.id).await?,
    };

    Ok(Json(stats))
}

/// Returns a course with its instructor's name.
#[utoipa::path(
    get,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course detail", body = CourseDetail),
        (status = 404, description = "Course not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_course(
    State(store): State<DynStore>,
    _actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = store
        .find_course_detail(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    Ok(Json(course))
}

/// Deletes a course that has no modules and no enrollments.
/// Owner or admin only.
#[utoipa::path(
    delete,
    path = "/api/courses/{id}",
    tag = "courses",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course removed"),
        (status = 400, description = "Course still has modules or enrollments"),
        (status = 401, description = "Not the course instructor"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_course(
    State(store): State<DynStore>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course: Course = store
        .find_course(id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !actor.can_manage(course.instructor_id) {
        return Err(AppError::AuthError("Not authorized".to_string()));
    }

    let dependents = store.count_course_dependents(id).await?;
    if dependents > 0 {
        return Err(AppError::Conflict(
            "Course still has modules or enrollments".to_string(),
        ));
    }

    if !store.delete_course(id).await? {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    tracing::info!(course_id = id, actor_id = actor.id, "Course removed");

    Ok(Json(serde_json::json!({ "message": "Course removed" })))
}

/// Streams the whole course as a ZIP archive.
///
/// `course.json` sits at the root, followed by one `<order>_<name>/`
/// directory per module in ascending module order.
#[utoipa::path(
    get,
    path = "/api/courses/{id}/export",
    tag = "export",
    params(("id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "ZIP archive", body = Vec<u8>, content_type = "application/zip"),
        (status = 401, description = "Not the course instructor"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer" = []))
)]
pub async fn export_course(
    State(store): State<DynStore>,
    State(resolver): State<FileResolver>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<ArchiveDownload, AppError> {
    tracing::info!(course_id = id, actor_id = actor.id, "Exporting course");

    let manifest = export::assemble_course(store.as_ref(), id, actor).await?;
    let manifest = resolver.resolve(manifest).await;
    let download = export::spool_archive(manifest).await?;

    tracing::info!(course_id = id, archive = %download.file_name, "Course export streaming");

    Ok(download)
}
