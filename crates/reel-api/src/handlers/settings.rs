//! Automation settings handlers.

use axum::extract::State;
use axum::Json;
use reel_models::RunSettings;

use crate::error::ApiResult;
use crate::state::AppState;

pub async fn get_settings(State(state): State<AppState>) -> Json<RunSettings> {
    Json(state.context().settings().get().await)
}

/// Replace the settings. The scheduler picks them up on its next pass.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<RunSettings>,
) -> ApiResult<Json<RunSettings>> {
    let saved = state.context().settings().update(settings).await?;
    Ok(Json(saved))
}
