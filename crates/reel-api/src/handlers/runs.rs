//! Run trigger and status handlers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use reel_models::{RunId, Visibility};
use reel_worker::RunRequest;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Manual trigger body. Both fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct StartRunRequest {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Serialize)]
pub struct StartRunResponse {
    pub run_id: RunId,
    pub topic: String,
    pub message: String,
}

impl StartRunRequest {
    /// An empty body means "all defaults"; anything else must parse.
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| ApiError::bad_request(format!("Invalid run request: {}", e)))
    }
}

/// Start a run and acknowledge immediately.
///
/// The outcome is only observable through `/api/events` and `/api/status`.
pub async fn start_run(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<StartRunResponse>)> {
    let body = StartRunRequest::from_body(&body)?;

    let handle = state
        .pipeline
        .start(RunRequest::manual(body.topic, body.visibility))
        .await?;

    info!(run_id = %handle.run_id, topic = %handle.topic, "Manual run accepted");

    Ok((
        StatusCode::ACCEPTED,
        Json(StartRunResponse {
            message: format!("Run started for \"{}\"", handle.topic),
            run_id: handle.run_id,
            topic: handle.topic,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub active_runs: usize,
    pub auto_enabled: bool,
    pub auto_schedule: String,
}

pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let ctx = state.context();
    let settings = ctx.settings().get().await;

    Json(StatusResponse {
        status: ctx.status_line().await,
        active_runs: ctx.active_runs(),
        auto_enabled: settings.auto_enabled,
        auto_schedule: settings.auto_schedule,
    })
}
