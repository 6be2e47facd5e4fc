// rest/mod.rs — Public REST API server.
//
// Axum HTTP server bridging routes to the lifecycle engine and user
// directory. Endpoints:
//
//   POST   /api/tasks
//   GET    /api/tasks?page&size
//   GET    /api/tasks/{id}
//   PUT    /api/tasks/{id}
//   DELETE /api/tasks/{id}
//   PUT    /api/tasks/{id}/start
//   PUT    /api/tasks/{id}/stop
//   PUT    /api/tasks/{id}/assign
//   PUT    /api/tasks/{id}/resources
//   POST   /api/users/register      (public)
//   POST   /api/users/login         (public)
//   GET    /api/users
//   PUT    /api/users/{id}
//   DELETE /api/users/{id}
//   PUT    /api/users/{id}/permissions
//   GET    /api/users/{id}/notifications
//   GET    /api/reports/task-completion
//   GET    /api/reports/user-dashboard/{id}
//   GET    /api/health              (no auth)

pub mod auth;
pub mod routes;

use anyhow::Result;
use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health (no auth)
        .route("/api/health", get(health))
        // Tasks
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/api/tasks/{id}/start", put(routes::tasks::start_timer))
        .route("/api/tasks/{id}/stop", put(routes::tasks::stop_timer))
        .route("/api/tasks/{id}/assign", put(routes::tasks::assign_task))
        .route(
            "/api/tasks/{id}/resources",
            put(routes::tasks::assign_resources),
        )
        // Users (register/login are public; the rest is admin-gated)
        .route("/api/users/register", post(routes::users::register))
        .route("/api/users/login", post(routes::users::login))
        .route("/api/users", get(routes::users::list_users))
        .route(
            "/api/users/{id}",
            put(routes::users::update_user).delete(routes::users::delete_user),
        )
        .route(
            "/api/users/{id}/permissions",
            put(routes::users::update_permissions),
        )
        .route(
            "/api/users/{id}/notifications",
            get(routes::users::list_notifications),
        )
        // Reports
        .route(
            "/api/reports/task-completion",
            get(routes::reports::task_completion),
        )
        .route(
            "/api/reports/user-dashboard/{id}",
            get(routes::reports::user_dashboard),
        )
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptimeSecs": ctx.started_at.elapsed().as_secs(),
    }))
}
