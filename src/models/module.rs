// src/models/module.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::ToSchema;
use validator::Validate;

/// Descriptor of an uploaded file owned by a module.
/// Entries are immutable once attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct StoredFile {
    /// Original file name as uploaded.
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Storage path, relative to the upload root.
    #[validate(length(min = 1, max = 1024))]
    pub path: String,

    pub mimetype: Option<String>,
    pub size: Option<i64>,
}

/// Represents the 'modules' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub module_name: String,
    pub description: Option<String>,

    /// Primary export/display sort key. Not unique within a course.
    pub module_order: i32,

    pub tasks_per_module: i32,
    pub module_test_questions: i32,
    pub total_tasks: i32,
    pub total_test_questions: i32,
    pub is_active: bool,

    /// Stored as a JSONB array, in attachment order.
    #[schema(value_type = Vec<StoredFile>)]
    pub files: Json<Vec<StoredFile>>,

    /// Instructor who created the module.
    pub created_by: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a module. `files` come from the upload service.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateModuleRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200, message = "Module name must be between 1 and 200 characters."))]
    pub module_name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Module order must be a positive integer."))]
    pub module_order: i32,
    #[validate(range(min = 0, max = 1000))]
    pub tasks_per_module: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub module_test_questions: Option<i32>,
    #[validate(nested)]
    #[serde(default)]
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Clone)]
pub struct NewModule {
    pub course_id: i64,
    pub module_name: String,
    pub description: Option<String>,
    pub module_order: i32,
    pub tasks_per_module: i32,
    pub module_test_questions: i32,
    pub files: Vec<StoredFile>,
    pub created_by: i64,
}

impl NewModule {
    pub fn from_request(req: CreateModuleRequest, created_by: i64) -> Self {
        Self {
            course_id: req.course_id,
            module_name: req.module_name.trim().to_string(),
            description: req.description,
            module_order: req.module_order,
            tasks_per_module: req.tasks_per_module.unwrap_or(10),
            module_test_questions: req.module_test_questions.unwrap_or(3),
            files: req.files,
            created_by,
        }
    }
}
