// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    docs,
    handlers::{course, enrollment, module, task},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Every `/api` route sits behind the bearer-token middleware.
/// * The OpenAPI document is public.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
        HeaderValue::from_static("http://localhost:5173"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .expose_headers([axum::http::header::CONTENT_DISPOSITION]);

    let enrollment_routes = Router::new()
        .route("/", post(enrollment::enroll_student))
        .route("/{id}", put(enrollment::update_enrollment_status))
        .route("/course/{course_id}", get(enrollment::get_enrolled_students))
        .route("/student", get(enrollment::get_student_enrollments));

    let course_routes = Router::new()
        .route("/", post(course::create_course))
        .route("/stats", get(course::get_instructor_stats))
        .route("/{id}", get(course::get_course).delete(course::delete_course))
        .route("/{id}/export", get(course::export_course));

    let module_routes = Router::new()
        .route("/", post(module::create_module))
        .route("/{id}/export", get(module::export_module));

    let task_routes = Router::new().route("/", get(task::list_tasks).post(task::create_task));

    let api_routes = Router::new()
        .nest("/enrollments", enrollment_routes)
        .nest("/courses", course_routes)
        .nest("/modules", module_routes)
        .nest("/tasks", task_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api_routes)
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        // Global Middleware (top to bottom, outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
