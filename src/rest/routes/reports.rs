// rest/routes/reports.rs — Reporting routes (admin / project-manager only).

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::reports::{self, CompletionReport, UserDashboard};
use crate::rest::auth::{self, Rejection, REPORT_ROLES};
use crate::AppContext;

fn failure(e: impl std::fmt::Display) -> Rejection {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
    )
}

pub async fn task_completion(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
) -> Result<Json<CompletionReport>, Rejection> {
    auth::require_role_user(&ctx, &headers, REPORT_ROLES).await?;
    match reports::completion_report(&ctx.task_store).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err(failure(e)),
    }
}

pub async fn user_dashboard(
    State(ctx): State<Arc<AppContext>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<UserDashboard>, Rejection> {
    auth::require_role_user(&ctx, &headers, REPORT_ROLES).await?;
    match reports::user_dashboard(&ctx.task_store, &id).await {
        Ok(dashboard) => Ok(Json(dashboard)),
        Err(e) => Err(failure(e)),
    }
}
