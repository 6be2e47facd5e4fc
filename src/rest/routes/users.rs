// rest/routes/users.rs — User REST routes.
//
// Register and login are public; everything else under /api/users requires
// the ADMIN role (legacy route rule).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::rest::auth::{self, Rejection};
use crate::storage::NotificationRow;
use crate::users::{Registration, Role, User, UserUpdate};
use crate::AppContext;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

fn failure(status: StatusCode, e: impl std::fmt::Display) -> Rejection {
    (status, Json(json!({ "error": e.to_string() })))
}

pub async fn register(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<Registration>,
) -> Result<(StatusCode, Json<User>), Rejection> {
    match ctx.users.register(&body).await {
        Ok(user) => Ok((StatusCode::CREATED, Json(user))),
        Err(e) => Err(failure(StatusCode::BAD_REQUEST, e)),
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>, Rejection> {
    let user = match ctx.users.authenticate(&body.username, &body.password).await {
        Ok(user) => user,
        Err(e) => return Err(failure(StatusCode::UNAUTHORIZED, e)),
    };
    match ctx.users.issue_token(&user.id).await {
        Ok(token) => Ok(Json(json!({
            "token": token,
            "id": user.id,
            "username": user.username,
            "role": user.role,
        }))),
        Err(e) => Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

pub async fn list_users(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<Vec<User>>, Rejection> {
    auth::require_role_user(&ctx, &headers, ADMIN_ONLY).await?;
    match ctx.users.list().await {
        Ok(users) => Ok(Json(users)),
        Err(e) => Err(failure(StatusCode::INTERNAL_SERVER_ERROR, e)),
    }
}

pub async fn update_permissions(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(permissions): Json<Vec<String>>,
) -> Result<Json<User>, Rejection> {
    auth::require_role_user(&ctx, &headers, ADMIN_ONLY).await?;
    match ctx.users.update_permissions(&id, &permissions).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(failure(StatusCode::NOT_FOUND, e)),
    }
}

pub async fn update_user(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<User>, Rejection> {
    auth::require_role_user(&ctx, &headers, ADMIN_ONLY).await?;
    match ctx.users.update(&id, &body).await {
        Ok(user) => Ok(Json(user)),
        Err(e) => Err(failure(StatusCode::NOT_FOUND, e)),
    }
}

pub async fn delete_user(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, Rejection> {
    auth::require_role_user(&ctx, &headers, ADMIN_ONLY).await?;
    match ctx.users.delete(&id).await {
        Ok(()) => Ok(Json(json!({ "deleted": id }))),
        Err(e) => Err(failure(StatusCode::NOT_FOUND, e)),
    }
}

/// A user's notification inbox, newest first.
pub async fn list_notifications(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<NotificationRow>>, Rejection> {
    auth::require_role_user(&ctx, &headers, ADMIN_ONLY).await?;
    match ctx.storage.list_notifications_for_user(&id).await {
        Ok(notifications) => Ok(Json(notifications)),
        Err(e) => Err(failure(StatusCode::NOT_FOUND, e)),
    }
}
