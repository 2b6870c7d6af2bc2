// src/models/enrollment.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::ParseEnumError;

/// Lifecycle of a student's relationship with a course.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    #[default]
    Pending,
    Active,
    Rejected,
    Dropped,
    Completed,
}

impl EnrollmentStatus {
    pub const ALL: [EnrollmentStatus; 5] = [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Active,
        EnrollmentStatus::Rejected,
        EnrollmentStatus::Dropped,
        EnrollmentStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "PENDING",
            EnrollmentStatus::Active => "ACTIVE",
            EnrollmentStatus::Rejected => "REJECTED",
            EnrollmentStatus::Dropped => "DROPPED",
            EnrollmentStatus::Completed => "COMPLETED",
        }
    }

    /// Ended attempts that a fresh enrollment request may revive.
    pub fn is_reenterable(&self) -> bool {
        matches!(self, EnrollmentStatus::Rejected | EnrollmentStatus::Dropped)
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnrollmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseEnumError {
                kind: "enrollment status",
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for EnrollmentStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents the 'enrollments' table. Unique per (course_id, student_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    pub id: i64,
    pub course_id: i64,
    pub student_id: i64,
    #[sqlx(try_from = "String")]
    pub status: EnrollmentStatus,
    pub enrollment_date: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A course's roster entry: student identity joined with enrollment state.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct EnrolledStudent {
    pub student_id: i64,
    pub enrollment_id: i64,
    pub name: String,
    pub email: String,
    pub enrollment_number: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: EnrollmentStatus,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
}

/// Course fields exposed alongside a student's enrollment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrolledCourse {
    pub id: i64,
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub subject: String,
    pub is_active: bool,
    pub instructor_id: i64,
    pub instructor_name: String,
}

/// One of the calling student's enrollments, with course detail nested.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StudentEnrollment {
    pub id: i64,
    pub status: EnrollmentStatus,
    pub enrollment_date: chrono::DateTime<chrono::Utc>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub course: EnrolledCourse,
}

/// DTO for an enrollment request. Fields are optional so that absence is
/// reported as a validation error instead of a body rejection.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollRequest {
    pub course_id: Option<i64>,
    pub student_email: Option<String>,
}

/// DTO for an enrollment status change.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEnrollmentStatusRequest {
    /// One of PENDING, ACTIVE, REJECTED, DROPPED, COMPLETED.
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_label() {
        for status in EnrollmentStatus::ALL {
            assert_eq!(status.as_str().parse::<EnrollmentStatus>().unwrap(), status);
        }
        assert_eq!("active".parse::<EnrollmentStatus>().unwrap(), EnrollmentStatus::Active);
        assert!("GRADUATED".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn only_rejected_and_dropped_are_reenterable() {
        let reenterable: Vec<_> = EnrollmentStatus::ALL
            .into_iter()
            .filter(EnrollmentStatus::is_reenterable)
            .collect();
        assert_eq!(
            reenterable,
            vec![EnrollmentStatus::Rejected, EnrollmentStatus::Dropped]
        );
    }
}
