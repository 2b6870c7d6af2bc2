// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Course {
    pub id: i64,

    /// Upper-cased, unique across all courses.
    pub course_code: String,

    pub course_name: String,
    pub description: Option<String>,
    pub subject: String,

    /// Owning instructor (users.id).
    pub instructor_id: i64,

    /// Number of questions drawn for the end-of-course test.
    pub course_test_questions: i32,

    pub is_active: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Course joined with its instructor's display name.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CourseDetail {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub course: Course,
    pub instructor_name: String,
}

/// Dashboard counts for one instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct InstructorStats {
    /// Courses the instructor owns.
    pub active_classes: i64,
    /// Distinct students enrolled across those courses, any status.
    pub total_students: i64,
}

/// DTO for creating a course.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 20, message = "Course code must be between 1 and 20 characters."))]
    pub course_code: String,
    #[validate(length(min = 1, max = 200, message = "Course name must be between 1 and 200 characters."))]
    pub course_name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Subject must be between 1 and 100 characters."))]
    pub subject: String,
    #[validate(range(min = 0, max = 100))]
    pub course_test_questions: Option<i32>,
}

/// Normalized course insert.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub course_code: String,
    pub course_name: String,
    pub description: Option<String>,
    pub subject: String,
    pub instructor_id: i64,
    pub course_test_questions: i32,
}

impl NewCourse {
    pub fn from_request(req: CreateCourseRequest, instructor_id: i64) -> Self {
        Self {
            course_code: req.course_code.trim().to_uppercase(),
            course_name: req.course_name.trim().to_string(),
            description: req.description,
            subject: req.subject.trim().to_string(),
            instructor_id,
            course_test_questions: req.course_test_questions.unwrap_or(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_code_is_upper_cased_and_defaults_applied() {
        let req = CreateCourseRequest {
            course_code: " cs101 ".to_string(),
            course_name: "Intro".to_string(),
            description: None,
            subject: "CS".to_string(),
            course_test_questions: None,
        };

        let new = NewCourse::from_request(req, 7);
        assert_eq!(new.course_code, "CS101");
        assert_eq!(new.course_test_questions, 5);
        assert_eq!(new.instructor_id, 7);
    }
}
