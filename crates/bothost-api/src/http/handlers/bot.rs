//! Per-bot handlers: upload, delete, lifecycle and source access.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use bothost_core::service::bot::EditOutcome;
use bothost_core::supervisor::lifecycle::StopOutcome;
use bothost_types::bot::{ProcessInfo, UploadRecord};
use bothost_types::identity::{BotIdentity, UserId};

use crate::http::error::AppError;
use crate::http::extractors::caller::CurrentCaller;
use crate::http::response::ApiResponse;
use crate::state::AppState;

type BotPath = Path<(i64, String)>;

fn identity((owner, name): (i64, String)) -> BotIdentity {
    BotIdentity::new(UserId(owner), name)
}

fn bot_href(identity: &BotIdentity) -> String {
    format!("/api/v1/users/{}/bots/{}", identity.owner, identity.name)
}

#[derive(Debug, Serialize)]
pub struct StopBody {
    pub exit_code: Option<i32>,
    pub forced: bool,
}

impl From<StopOutcome> for StopBody {
    fn from(o: StopOutcome) -> Self {
        Self {
            exit_code: o.exit_code,
            forced: o.forced,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EditBody {
    pub saved: bool,
    pub restarted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_error: Option<String>,
}

impl From<EditOutcome> for EditBody {
    fn from(outcome: EditOutcome) -> Self {
        match outcome {
            EditOutcome::Saved => Self {
                saved: true,
                restarted: false,
                process: None,
                restart_error: None,
            },
            EditOutcome::Restarted(info) => Self {
                saved: true,
                restarted: true,
                process: Some(info),
                restart_error: None,
            },
            EditOutcome::RestartFailed(e) => Self {
                saved: true,
                restarted: false,
                process: None,
                restart_error: Some(e.to_string()),
            },
        }
    }
}

/// GET /api/v1/users/{owner}/bots - List a user's bots.
pub async fn list_bots(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(owner): Path<i64>,
) -> Result<Json<ApiResponse<Vec<UploadRecord>>>, AppError> {
    let start = Instant::now();
    let bots = state.service.list(&caller, Some(UserId(owner))).await?;
    Ok(Json(
        ApiResponse::since(bots, start).with_link("self", &format!("/api/v1/users/{owner}/bots")),
    ))
}

/// PUT /api/v1/users/{owner}/bots/{filename} - Upload a new bot (raw body).
pub async fn upload_bot(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path((owner, filename)): BotPath,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<UploadRecord>>), AppError> {
    let start = Instant::now();
    let record = state
        .service
        .upload(&caller, UserId(owner), &filename, &body)
        .await?;
    let href = bot_href(&record.identity);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::since(record, start).with_link("self", &href)),
    ))
}

/// DELETE /api/v1/users/{owner}/bots/{name} - Stop if running, then delete.
pub async fn delete_bot(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(path): BotPath,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let id = identity(path);
    state.service.delete(&caller, &id).await?;
    Ok(Json(ApiResponse::since(
        serde_json::json!({ "deleted": id }),
        start,
    )))
}

/// POST /api/v1/users/{owner}/bots/{name}/start
pub async fn start_bot(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(path): BotPath,
) -> Result<Json<ApiResponse<ProcessInfo>>, AppError> {
    let start = Instant::now();
    let info = state.service.start(&caller, &identity(path)).await?;
    Ok(Json(ApiResponse::since(info, start)))
}

/// POST /api/v1/users/{owner}/bots/{name}/stop
pub async fn stop_bot(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(path): BotPath,
) -> Result<Json<ApiResponse<StopBody>>, AppError> {
    let start = Instant::now();
    let outcome = state.service.stop(&caller, &identity(path)).await?;
    Ok(Json(ApiResponse::since(outcome.into(), start)))
}

/// POST /api/v1/users/{owner}/bots/{name}/restart
pub async fn restart_bot(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(path): BotPath,
) -> Result<Json<ApiResponse<ProcessInfo>>, AppError> {
    let start = Instant::now();
    let info = state.service.restart(&caller, &identity(path)).await?;
    Ok(Json(ApiResponse::since(info, start)))
}

/// GET /api/v1/users/{owner}/bots/{name}/source - Download the source file.
pub async fn download_source(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(path): BotPath,
) -> Result<Response, AppError> {
    let (record, content) = state.service.download(&caller, &identity(path)).await?;
    let disposition = format!("attachment; filename=\"{}\"", record.identity.name);
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}

/// PUT /api/v1/users/{owner}/bots/{name}/source - Replace the source file.
///
/// A running bot is restarted on the new source. A failed restart still
/// returns 200: the new source is saved and `restart_error` says why the bot
/// is down.
pub async fn edit_source(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Path(path): BotPath,
    body: Bytes,
) -> Result<Json<ApiResponse<EditBody>>, AppError> {
    let start = Instant::now();
    let outcome = state.service.edit(&caller, &identity(path), &body).await?;
    Ok(Json(ApiResponse::since(outcome.into(), start)))
}
