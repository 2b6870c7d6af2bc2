// src/docs.rs

use axum::{Json, response::IntoResponse};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{course, enrollment, module, task},
    models::{
        course::{Course, CourseDetail, CreateCourseRequest, InstructorStats},
        enrollment::{
            EnrollRequest, EnrolledCourse, EnrolledStudent, Enrollment, EnrollmentStatus,
            StudentEnrollment, UpdateEnrollmentStatusRequest,
        },
        module::{CreateModuleRequest, Module, StoredFile},
        task::{CreateTaskRequest, Difficulty, Task, TestCase, TestCaseInput},
    },
};

/// OpenAPI document for the enrollment and export endpoints.
#[derive(OpenApi)]
#[openapi(
    info(title = "LMS Backend API", description = "Enrollment workflow and content export"),
    paths(
        enrollment::enroll_student,
        enrollment::update_enrollment_status,
        enrollment::get_enrolled_students,
        enrollment::get_student_enrollments,
        course::create_course,
        course::get_instructor_stats,
        course::get_course,
        course::delete_course,
        course::export_course,
        module::create_module,
        module::export_module,
        task::create_task,
        task::list_tasks,
    ),
    components(schemas(
        Course,
        CourseDetail,
        CreateCourseRequest,
        InstructorStats,
        Module,
        CreateModuleRequest,
        StoredFile,
        Task,
        CreateTaskRequest,
        TestCase,
        TestCaseInput,
        Difficulty,
        Enrollment,
        EnrollmentStatus,
        EnrolledStudent,
        EnrolledCourse,
        StudentEnrollment,
        EnrollRequest,
        UpdateEnrollmentStatusRequest,
    )),
    tags(
        (name = "enrollments", description = "Student enrollment lifecycle"),
        (name = "courses", description = "Course management and instructor stats"),
        (name = "modules", description = "Modules and their tasks"),
        (name = "export", description = "ZIP export of courses and modules")
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated OpenAPI JSON.
pub async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_export_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/courses/{id}/export"));
        assert!(doc.paths.paths.contains_key("/api/modules/{id}/export"));
        assert!(doc.paths.paths.contains_key("/api/enrollments"));
        assert!(doc.paths.paths.contains_key("/api/courses"));
        assert!(doc.paths.paths.contains_key("/api/courses/stats"));
        assert!(doc.paths.paths.contains_key("/api/modules"));
        assert!(doc.paths.paths.contains_key("/api/tasks"));

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
        assert!(components.schemas.contains_key("CreateTaskRequest"));
    }
}
