// src/services/enrollment.rs

//! Student ↔ course relationship lifecycle.
//!
//! At most one enrollment exists per (course, student). A REJECTED or DROPPED
//! record is revived in place by a new request; everything else conflicts.

use crate::{
    error::AppError,
    models::{
        enrollment::{EnrolledStudent, Enrollment, EnrollmentStatus, StudentEnrollment},
        user::Actor,
    },
    store::{Store, StoreError},
};

use EnrollmentStatus::{Active, Completed, Dropped, Pending, Rejected};

const ALREADY_ENROLLED: &str = "Student already enrolled";

/// Result of an enrollment request.
#[derive(Debug, Clone)]
pub enum EnrollOutcome {
    /// A new PENDING record was inserted.
    Created(Enrollment),
    /// An ended attempt was moved back to PENDING.
    Revived(Enrollment),
}

impl EnrollOutcome {
    pub fn enrollment(&self) -> &Enrollment {
        match self {
            EnrollOutcome::Created(e) | EnrollOutcome::Revived(e) => e,
        }
    }

    pub fn into_enrollment(self) -> Enrollment {
        match self {
            EnrollOutcome::Created(e) | EnrollOutcome::Revived(e) => e,
        }
    }
}

/// Status changes an instructor may make. Same-status updates are no-ops.
/// PENDING is only re-entered through a new enrollment request.
pub fn transition_allowed(from: EnrollmentStatus, to: EnrollmentStatus) -> bool {
    if from == to {
        return true;
    }
    matches!(
        (from, to),
        (Pending, Active | Rejected | Dropped)
            | (Active, Dropped | Completed)
            | (Rejected, Active)
            | (Dropped, Active)
    )
}

/// Enrolls the student with `student_email` in `course_id`.
pub async fn request_enrollment(
    store: &dyn Store,
    course_id: i64,
    student_email: &str,
) -> Result<EnrollOutcome, AppError> {
    let student = store
        .find_user_by_email(student_email)
        .await?
        .ok_or(AppError::NotFound("Student not found with that email".to_string()))?;

    store
        .find_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if let Some(existing) = store.find_enrollment_for(course_id, student.id).await? {
        if !existing.status.is_reenterable() {
            return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()));
        }

        // Conditional on the status still being re-enterable; a concurrent
        // request may have revived it first.
        return match store
            .transition_enrollment(existing.id, &[Rejected, Dropped], Pending)
            .await?
        {
            Some(revived) => {
                tracing::info!(
                    enrollment_id = revived.id,
                    course_id,
                    student_id = student.id,
                    previous = %existing.status,
                    "Enrollment re-requested"
                );
                Ok(EnrollOutcome::Revived(revived))
            }
            None => Err(AppError::Conflict(ALREADY_ENROLLED.to_string())),
        };
    }

    match store.insert_enrollment(course_id, student.id, Pending).await {
        Ok(created) => {
            tracing::info!(
                enrollment_id = created.id,
                course_id,
                student_id = student.id,
                "Enrollment requested"
            );
            Ok(EnrollOutcome::Created(created))
        }
        // Lost the race against a concurrent insert for the same pair.
        Err(StoreError::UniqueViolation(constraint)) => {
            tracing::warn!(
                course_id,
                student_id = student.id,
                %constraint,
                "Concurrent enrollment insert rejected"
            );
            Err(AppError::Conflict(ALREADY_ENROLLED.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Sets an enrollment's status on behalf of the course's instructor or an admin.
pub async fn update_status(
    store: &dyn Store,
    enrollment_id: i64,
    new_status: EnrollmentStatus,
    actor: Actor,
) -> Result<Enrollment, AppError> {
    let enrollment = store
        .find_enrollment(enrollment_id)
        .await?
        .ok_or(AppError::NotFound("Enrollment not found".to_string()))?;

    let course = store
        .find_course(enrollment.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !actor.can_manage(course.instructor_id) {
        return Err(AppError::AuthError("Not authorized".to_string()));
    }

    if enrollment.status == new_status {
        return Ok(enrollment);
    }

    if !transition_allowed(enrollment.status, new_status) {
        return Err(AppError::BadRequest(format!(
            "Cannot change enrollment status from {} to {}",
            enrollment.status, new_status
        )));
    }

    let updated = store
        .transition_enrollment(enrollment.id, &[enrollment.status], new_status)
        .await?
        .ok_or_else(|| {
            AppError::Conflict("Enrollment was modified concurrently, please retry".to_string())
        })?;

    tracing::info!(
        enrollment_id,
        actor_id = actor.id,
        from = %enrollment.status,
        to = %new_status,
        "Enrollment status updated"
    );

    Ok(updated)
}

/// Roster for a course, visible to its instructor and admins.
pub async fn list_enrolled_students(
    store: &dyn Store,
    course_id: i64,
    actor: Actor,
) -> Result<Vec<EnrolledStudent>, AppError> {
    let course = store
        .find_course(course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !actor.can_manage(course.instructor_id) {
        return Err(AppError::AuthError("Not authorized".to_string()));
    }

    Ok(store.list_course_enrollments(course_id).await?)
}

/// The calling student's enrollments with course detail.
pub async fn list_student_enrollments(
    store: &dyn Store,
    actor: Actor,
) -> Result<Vec<StudentEnrollment>, AppError> {
    Ok(store.list_student_enrollments(actor.id).await?)
}
