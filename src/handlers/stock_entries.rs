use axum::{
    extract::{Path, State},
    response::Response,
};

use super::common::success_response;
use crate::{errors::ApiError, AppState};

#[utoipa::path(
    get,
    path = "/api/v1/stock-entries/{id}",
    summary = "Get stock entry",
    params(("id" = i64, Path, description = "Stock entry ID")),
    responses(
        (status = 200, description = "Stock entry retrieved", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Stock entry not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Stock Entries"
)]
pub async fn get_stock_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.stock_entries.get(id).await?;
    Ok(success_response(detail))
}

/// Post a draft stock entry to the stock ledger
#[utoipa::path(
    post,
    path = "/api/v1/stock-entries/{id}/submit",
    summary = "Submit stock entry",
    params(("id" = i64, Path, description = "Stock entry ID")),
    responses(
        (status = 200, description = "Stock entry submitted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid state or operations incomplete", body = crate::errors::ErrorResponse),
        (status = 409, description = "Exceeds work order quantity", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "Stock Entries"
)]
pub async fn submit_stock_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.stock_entries.submit(id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/stock-entries/{id}/cancel",
    summary = "Cancel stock entry",
    params(("id" = i64, Path, description = "Stock entry ID")),
    responses(
        (status = 200, description = "Stock entry cancelled", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid state", body = crate::errors::ErrorResponse),
        (status = 422, description = "Reversal would make stock negative", body = crate::errors::ErrorResponse),
    ),
    tag = "Stock Entries"
)]
pub async fn cancel_stock_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.stock_entries.cancel(id).await?;
    Ok(success_response(detail))
}
