use axum::{
    extract::{Path, State},
    response::Response,
};

use super::common::success_response;
use crate::{errors::ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/timesheets/{id}",
    summary = "Get timesheet",
    params(("id" = i64, Path, description = "Timesheet ID")),
    responses(
        (status = 200, description = "Timesheet retrieved", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Timesheet not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Timesheets"
)]
pub async fn get_timesheet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.timesheets.get(id).await?;
    Ok(success_response(detail))
}

/// Submit a timesheet and roll its time logs into the work order operations
#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/submit",
    summary = "Submit timesheet",
    params(("id" = i64, Path, description = "Timesheet ID")),
    responses(
        (status = 200, description = "Timesheet submitted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid state", body = crate::errors::ErrorResponse),
        (status = 409, description = "Completed quantity exceeds work order quantity", body = crate::errors::ErrorResponse),
    ),
    tag = "Timesheets"
)]
pub async fn submit_timesheet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.timesheets.submit(id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/timesheets/{id}/cancel",
    summary = "Cancel timesheet",
    params(("id" = i64, Path, description = "Timesheet ID")),
    responses(
        (status = 200, description = "Timesheet cancelled", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid state", body = crate::errors::ErrorResponse),
    ),
    tag = "Timesheets"
)]
pub async fn cancel_timesheet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.timesheets.cancel(id).await?;
    Ok(success_response(detail))
}
