//! Health, status and activity endpoints.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};

use bothost_types::activity::ActivityEntry;
use bothost_types::bot::{ProcessInfo, UserStatus};
use bothost_types::identity::UserId;

use crate::http::error::AppError;
use crate::http::extractors::caller::CurrentCaller;
use crate::http::extractors::query::ActivityQuery;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /health - Liveness probe. No caller required.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "running": state.service.lifecycle().registry().len(),
    }))
}

/// GET /api/v1/status - The caller's usage and quota.
pub async fn my_status(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<ApiResponse<UserStatus>>, AppError> {
    let start = Instant::now();
    let status = state.service.status(&caller, caller.user_id).await?;
    Ok(Json(ApiResponse::since(status, start)))
}

/// GET /api/v1/processes - Live processes visible to the caller.
pub async fn processes(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Json<ApiResponse<Vec<ProcessInfo>>> {
    let start = Instant::now();
    Json(ApiResponse::since(state.service.processes(&caller), start))
}

/// GET /api/v1/activity - Recent audit entries.
///
/// Without `user`, the admin sees everyone and other callers see themselves.
pub async fn activity(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<Vec<ActivityEntry>>>, AppError> {
    let start = Instant::now();
    if query.limit <= 0 {
        return Err(AppError::Validation("limit must be positive".to_string()));
    }

    let user = match query.user {
        Some(id) => Some(UserId(id)),
        None if caller.is_admin => None,
        None => Some(caller.user_id),
    };
    let entries = state.service.activity(&caller, user, query.limit).await?;
    Ok(Json(ApiResponse::since(entries, start)))
}
