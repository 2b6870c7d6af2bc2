// src/handlers/task.rs

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        task::{CreateTaskRequest, NewTask, Task, TaskListParams},
        user::Actor,
    },
    state::DynStore,
};

/// Creates a task in a module. Unknown fields are rejected.
/// Module creator or admin only.
#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "modules",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Invalid input or unknown field"),
        (status = 401, description = "Not the module creator"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer" = []))
)]
pub async fn create_task(
    State(store): State<DynStore>,
    actor: Actor,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let payload: CreateTaskRequest = serde_json::from_value(body)?;
    payload.validate()?;

    let module = store
        .find_module(payload.module_id)
        .await?
        .ok_or(AppError::NotFound("Module not found".to_string()))?;

    if !actor.can_manage(module.created_by) {
        return Err(AppError::AuthError(
            "Not authorized to add tasks to this module".to_string(),
        ));
    }

    let task = store.create_task(NewTask::from(payload)).await?;

    tracing::info!(task_id = task.id, module_id = task.module_id, "Task created");

    Ok((StatusCode::CREATED, Json(task)))
}

/// Lists a module's tasks in creation order.
#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "modules",
    params(TaskListParams),
    responses(
        (status = 200, description = "Tasks in creation order", body = Vec<Task>),
        (status = 400, description = "module_id missing"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer" = []))
)]
pub async fn list_tasks(
    State(store): State<DynStore>,
    _actor: Actor,
    Query(params): Query<TaskListParams>,
) -> Result<impl IntoResponse, AppError> {
    let module_id = params
        .module_id
        .ok_or(AppError::BadRequest("module_id is required".to_string()))?;

    store
        .find_module(module_id)
        .await?
        .ok_or(AppError::NotFound("Module not found".to_string()))?;

    let tasks = store.list_module_tasks(module_id).await?;
    Ok(Json(tasks))
}
