// src/handlers/enrollment.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    error::AppError,
    models::{
        enrollment::{
            EnrollRequest, EnrolledStudent, Enrollment, EnrollmentStatus, StudentEnrollment,
            UpdateEnrollmentStatusRequest,
        },
        user::Actor,
    },
    services::enrollment::{self, EnrollOutcome},
    state::DynStore,
};

/// Enrolls a student (looked up by e-mail) in a course.
///
/// * New enrollments start as PENDING and return 201.
/// * A REJECTED or DROPPED enrollment is revived to PENDING and returns 200.
/// * Any other existing enrollment is a conflict (400).
#[utoipa::path(
    post,
    path = "/api/enrollments",
    tag = "enrollments",
    request_body = EnrollRequest,
    responses(
        (status = 201, description = "Enrollment created", body = Enrollment),
        (status = 200, description = "Previous enrollment re-requested", body = Enrollment),
        (status = 400, description = "Missing fields or already enrolled"),
        (status = 404, description = "Student or course not found")
    ),
    security(("bearer" = []))
)]
pub async fn enroll_student(
    State(store): State<DynStore>,
    actor: Actor,
    Json(req): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (course_id, student_email) = match (req.course_id, req.student_email) {
        (Some(course_id), Some(email)) if !email.trim().is_empty() => (course_id, email),
        _ => {
            return Err(AppError::BadRequest(
                "Course ID and Student Email are required".to_string(),
            ));
        }
    };

    tracing::debug!(course_id, actor_id = actor.id, "Enrollment request");

    let outcome =
        enrollment::request_enrollment(store.as_ref(), course_id, student_email.trim()).await?;

    let status = match outcome {
        EnrollOutcome::Created(_) => StatusCode::CREATED,
        EnrollOutcome::Revived(_) => StatusCode::OK,
    };

    Ok((status, Json(outcome.into_enrollment())))
}

/// Approves, rejects, drops or completes an enrollment.
/// Course instructor or admin only.
#[utoipa::path(
    put,
    path = "/api/enrollments/{id}",
    tag = "enrollments",
    params(("id" = i64, Path, description = "Enrollment ID")),
    request_body = UpdateEnrollmentStatusRequest,
    responses(
        (status = 200, description = "Updated enrollment", body = Enrollment),
        (status = 400, description = "Invalid status or transition"),
        (status = 401, description = "Not the course instructor"),
        (status = 404, description = "Enrollment not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_enrollment_status(
    State(store): State<DynStore>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(req): Json<UpdateEnrollmentStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status = req
        .status
        .ok_or(AppError::BadRequest("Status is required".to_string()))?
        .parse::<EnrollmentStatus>()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let updated = enrollment::update_status(store.as_ref(), id, status, actor).await?;

    Ok(Json(updated))
}

/// Lists the students enrolled in a course.
#[utoipa::path(
    get,
    path = "/api/enrollments/course/{course_id}",
    tag = "enrollments",
    params(("course_id" = i64, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Course roster", body = Vec<EnrolledStudent>),
        (status = 401, description = "Not the course instructor"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_enrolled_students(
    State(store): State<DynStore>,
    actor: Actor,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let students = enrollment::list_enrolled_students(store.as_ref(), course_id, actor).await?;
    Ok(Json(students))
}

/// Lists the calling student's enrollments.
#[utoipa::path(
    get,
    path = "/api/enrollments/student",
    tag = "enrollments",
    responses(
        (status = 200, description = "Enrollments with course detail", body = Vec<StudentEnrollment>)
    ),
    security(("bearer" = []))
)]
pub async fn get_student_enrollments(
    State(store): State<DynStore>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let enrollments = enrollment::list_student_enrollments(store.as_ref(), actor).await?;
    Ok(Json(enrollments))
}
