// rest/routes/tasks.rs — Task REST routes.
//
// Status-code mapping mirrors the legacy API: timer and mutation routes
// answer 400 for any core failure (including not-found), lookup routes 404,
// the listing route 500. Role gates: any task role may read and mutate;
// create and delete require a manager role.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::auth::{self, Rejection, MANAGER_ROLES, TASK_ROLES};
use crate::tasks::engine::{NewTask, TaskUpdate};
use crate::tasks::Task;
use crate::AppContext;

fn failure(status: StatusCode, e: impl std::fmt::Display) -> Rejection {
    (status, Json(json!({ "error": e.to_string() })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRequest {
    pub task: NewTask,
    #[serde(default)]
    pub dependency_ids: Vec<String>,
}

#[derive(Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

pub async fn create_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Json(body): Json<TaskRequest>,
) -> Result<(StatusCode, Json<Task>), Rejection> {
    auth::require_role_user(&ctx, &headers, MANAGER_ROLES).await?;
    match ctx.engine.create_task(&body.task, &body.dependency_ids).await {
        Ok(task) => Ok((StatusCode::CREATED, Json(task))),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}

pub async fn list_tasks(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    let page = params.page.unwrap_or(0);
    let size = params.size.unwrap_or(ctx.config.default_page_size);
    match ctx.engine.list_tasks(page, size).await {
        // Spring-style Page envelope — existing clients read `content`.
        Ok((tasks, total)) => Ok(Json(json!({
            "content": tasks,
            "page": page,
            "size": size,
            "totalElements": total,
        }))),
        Err(e) => Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

pub async fn get_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Task>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    match ctx.engine.get_task(&id).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(failure(StatusCode::NOT_FOUND, e)),
    }
}

pub async fn update_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TaskUpdate>,
) -> Result<Json<Task>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    match ctx.engine.update_task(&id, &body).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}

pub async fn delete_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, Rejection> {
    auth::require_role_user(&ctx, &headers, MANAGER_ROLES).await?;
    match ctx.engine.delete_task(&id).await {
        Ok(()) => Ok(Json(json!({ "deleted": id }))),
        Err(e) => Err(failure(StatusCode::NOT_FOUND, e)),
    }
}

pub async fn start_timer(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Task>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    match ctx.engine.start_timer(&id).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}

pub async fn stop_timer(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Task>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    match ctx.engine.stop_timer(&id).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}

/// Body is the raw user id as a JSON string.
pub async fn assign_task(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(user_id): Json<String>,
) -> Result<Json<Task>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    match ctx.engine.assign_task_to_user(&id, &user_id).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}

pub async fn assign_resources(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(resource_ids): Json<Vec<String>>,
) -> Result<Json<Task>, Rejection> {
    auth::require_role_user(&ctx, &headers, TASK_ROLES).await?;
    match ctx.engine.assign_resources(&id, &resource_ids).await {
        Ok(task) => Ok(Json(task)),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}
