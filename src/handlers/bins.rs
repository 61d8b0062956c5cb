use axum::{
    extract::{Path, State},
    response::Response,
};

use super::common::success_response;
use crate::{errors::ApiError, AppState};

/// Stock counters for an item in a warehouse
#[utoipa::path(
    get,
    path = "/api/v1/bins/{item_code}/{warehouse}",
    summary = "Get bin",
    params(
        ("item_code" = String, Path, description = "Item code"),
        ("warehouse" = String, Path, description = "Warehouse name"),
    ),
    responses(
        (status = 200, description = "Bin retrieved", body = crate::ApiResponse<serde_json::Value>),
    ),
    tag = "Stock"
)]
pub async fn get_bin(
    State(state): State<AppState>,
    Path((item_code, warehouse)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let bin = state.services.bins.get_bin(&item_code, &warehouse).await?;
    Ok(success_response(bin))
}
