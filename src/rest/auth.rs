// rest/auth.rs — Bearer-token authentication and role guards.
//
// Stateless scheme: login issues an opaque token, every protected route
// resolves it back to a user and compares roles before dispatching to the
// core. Failures surface as 401 with an `{"error": ...}` body.

use axum::{
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::storage::UserRow;
use crate::users::Role;
use crate::AppContext;

pub type Rejection = (StatusCode, Json<Value>);

/// Roles allowed on `/api/tasks/*` routes.
pub const TASK_ROLES: &[Role] = &[
    Role::Admin,
    Role::ProjectManager,
    Role::TeamLeader,
    Role::TeamMember,
];

/// Roles allowed to create and delete tasks.
pub const MANAGER_ROLES: &[Role] = &[Role::Admin, Role::ProjectManager];

/// Roles allowed on report routes.
pub const REPORT_ROLES: &[Role] = &[Role::Admin, Role::ProjectManager];

pub fn unauthorized(message: &str) -> Rejection {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

/// Resolve the bearer token in `Authorization` to a user row.
pub async fn require_user(ctx: &AppContext, headers: &HeaderMap) -> Result<UserRow, Rejection> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| unauthorized("Missing bearer token"))?;

    match ctx.users.user_for_token(token).await {
        Ok(Some(user)) => Ok(user),
        _ => Err(unauthorized("Invalid token")),
    }
}

/// Coarse role comparison: reject unless the user's role is in `allowed`.
pub fn require_role(user: &UserRow, allowed: &[Role]) -> Result<(), Rejection> {
    match Role::parse(&user.role) {
        Some(role) if allowed.contains(&role) => Ok(()),
        _ => Err(unauthorized("Insufficient role")),
    }
}

/// Convenience: authenticated user with one of `allowed` roles.
pub async fn require_role_user(
    ctx: &AppContext,
    headers: &HeaderMap,
    allowed: &[Role],
) -> Result<UserRow, Rejection> {
    let user = require_user(ctx, headers).await?;
    require_role(&user, allowed)?;
    Ok(user)
}
