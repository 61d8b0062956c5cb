use axum::{extract::State, response::Response, Json};

use super::common::{success_response, validate_input};
use crate::{errors::ApiError, services::settings::UpdateSettingsRequest, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/manufacturing-settings",
    summary = "Get manufacturing settings",
    responses(
        (status = 200, description = "Current settings", body = crate::ApiResponse<serde_json::Value>),
    ),
    tag = "Settings"
)]
pub async fn get_settings(State(state): State<AppState>) -> Result<Response, ApiError> {
    let settings = state.services.settings.get().await?;
    Ok(success_response(settings))
}

/// Partially update manufacturing settings; empty warehouse strings clear the default
#[utoipa::path(
    put,
    path = "/api/v1/manufacturing-settings",
    summary = "Update manufacturing settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Percentage out of range", body = crate::errors::ErrorResponse),
    ),
    tag = "Settings"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let settings = state.services.settings.update(payload).await?;
    Ok(success_response(settings))
}
