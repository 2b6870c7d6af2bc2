// src/handlers/module.rs

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
        module::{CreateModuleRequest, Module, NewModule},
        user::Actor,
    },
    services::export::{self, ArchiveDownload, FileResolver},
    state::DynStore,
};

/// Adds a module to a course. `files` are descriptors of already-stored
/// uploads; their bytes are only read at export time.
#[utoipa::path(
    post,
    path = "/api/modules",
    tag = "modules",
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Module created", body = Module),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Not the course instructor"),
        (status = 404, description = "Course not found")
    ),
    security(("bearer" = []))
)]
pub async fn create_module(
    State(store): State<DynStore>,
    actor: Actor,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let payload: CreateModuleRequest = serde_json::from_value(body)?;
    payload.validate()?;

    let course = store
        .find_course(payload.course_id)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !actor.can_manage(course.instructor_id) {
        return Err(AppError::AuthError(
            "Not authorized to add modules to this course".to_string(),
        ));
    }

    let module = store
        .create_module(NewModule::from_request(payload, actor.id))
        .await?;

    tracing::info!(
        module_id = module.id,
        course_id = module.course_id,
        files = module.files.len(),
        "Module created"
    );

    Ok((StatusCode::CREATED, Json(module)))
}

/// Streams one module as a ZIP archive with a flat layout.
#[utoipa::path(
    get,
    path = "/api/modules/{id}/export",
    tag = "export",
    params(("id" = i64, Path, description = "Module ID")),
    responses(
        (status = 200, description = "ZIP archive", body = Vec<u8>, content_type = "application/zip"),
        (status = 401, description = "Not the module creator"),
        (status = 404, description = "Module not found")
    ),
    security(("bearer" = []))
)]
pub async fn export_module(
    State(store): State<DynStore>,
    State(resolver): State<FileResolver>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<ArchiveDownload, AppError> {
    tracing::info!(module_id = id, actor_id = actor.id, "Exporting module");

    let manifest = export::assemble_module(store.as_ref(), id, actor).await?;
    let manifest = resolver.resolve(manifest).await;
    let download = export::spool_archive(manifest).await?;

    tracing::info!(module_id = id, archive = %download.file_name, "Module export streaming");

    Ok(download)
}
