//! Administrative endpoints. Every one of them requires the admin caller;
//! the service enforces it.

use std::time::Instant;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use bothost_core::supervisor::lifecycle::BulkReport;
use bothost_types::bot::HostStats;
use bothost_types::identity::{BotIdentity, UserId};
use bothost_types::quota::{QuotaUpdate, StoredQuota, UserQuota};

use crate::http::error::AppError;
use crate::http::extractors::caller::CurrentCaller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub bot: BotIdentity,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BulkBody {
    pub succeeded: Vec<BotIdentity>,
    pub failed: Vec<BulkFailure>,
}

impl From<BulkReport> for BulkBody {
    fn from(report: BulkReport) -> Self {
        Self {
            succeeded: report.succeeded,
            failed: report
                .failed
                .into_iter()
                .map(|(bot, e)| BulkFailure {
                    bot,
                    error: e.to_string(),
                })
                .collect(),
        }
    }
}

/// GET /api/v1/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<ApiResponse<HostStats>>, AppError> {
    let start = Instant::now();
    let stats = state.service.stats(&caller).await?;
    Ok(Json(ApiResponse::since(stats, start)))
}

/// POST /api/v1/admin/stop-all
pub async fn stop_all(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<ApiResponse<BulkBody>>, AppError> {
    let start = Instant::now();
    let report = state.service.stop_all(&caller).await?;
    Ok(Json(ApiResponse::since(report.into(), start)))
}

/// POST /api/v1/admin/restart-all
pub async fn restart_all(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<ApiResponse<BulkBody>>, AppError> {
    let start = Instant::now();
    let report = state.service.restart_all(&caller).await?;
    Ok(Json(ApiResponse::since(report.into(), start)))
}

/// GET /api/v1/admin/quotas - Every explicitly configured quota.
pub async fn list_quotas(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
) -> Result<Json<ApiResponse<Vec<StoredQuota>>>, AppError> {
    let start = Instant::now();
    let quotas = state.service.quotas(&caller).await?;
    Ok(Json(ApiResponse::since(quotas, start)))
}

/// PUT /api/v1/admin/quotas/{user}
pub async fn set_quota(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(user): Path<i64>,
    Json(update): Json<QuotaUpdate>,
) -> Result<Json<ApiResponse<UserQuota>>, AppError> {
    let start = Instant::now();
    if update.upload_limit.is_none() && update.run_limit.is_none() {
        return Err(AppError::Validation(
            "set upload_limit, run_limit or both".to_string(),
        ));
    }
    let quota = state.service.set_quota(&caller, UserId(user), &update).await?;
    Ok(Json(ApiResponse::since(quota, start)))
}
