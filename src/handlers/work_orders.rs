use axum::{
    extract::{Path, State},
    response::Response,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use super::common::{created_response, parse_enum, success_response, validate_input};
use crate::{
    errors::ApiError,
    services::work_orders::{NewWorkOrderArgs, StopAction, WorkOrderChanges},
    AppState,
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct WorkOrderStatusRequest {
    /// `Stopped` or `Resumed`
    pub status: String,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct MakeStockEntryRequest {
    /// `Material Transfer for Manufacture` or `Manufacture`
    pub purpose: String,
    /// Defaults to the quantity still outstanding
    pub qty: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct MakeTimesheetRequest {
    pub company: Option<String>,
}

/// Create a work order from the production item's BOM
#[utoipa::path(
    post,
    path = "/api/v1/work-orders",
    summary = "Create work order",
    request_body = NewWorkOrderArgs,
    responses(
        (status = 201, description = "Work order created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 409, description = "Exceeds sales order quantity", body = crate::errors::ErrorResponse),
    ),
    tag = "Work Orders"
)]
pub async fn create_work_order(
    State(state): State<AppState>,
    Json(payload): Json<NewWorkOrderArgs>,
) -> Result<Response, ApiError> {
    validate_input(&payload)?;
    let service = &state.services.work_orders;

    let draft = service.new_from_bom(payload).await?;
    let created = service.insert(draft).await?;

    info!(work_order_id = created.work_order.id, "Work order created via API");
    Ok(created_response(created))
}

/// Get a work order with its required items and operations
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    summary = "Get work order",
    params(("id" = i64, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order retrieved", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Work Orders"
)]
pub async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.work_orders.get(id).await?;
    Ok(success_response(detail))
}

/// Edit a draft work order
#[utoipa::path(
    put,
    path = "/api/v1/work-orders/{id}",
    summary = "Update draft work order",
    params(("id" = i64, Path, description = "Work order ID")),
    request_body = WorkOrderChanges,
    responses(
        (status = 200, description = "Work order updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Not a draft or invalid", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Work Orders"
)]
pub async fn update_work_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<WorkOrderChanges>,
) -> Result<Response, ApiError> {
    let detail = state.services.work_orders.save(id, payload).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/submit",
    summary = "Submit work order",
    params(("id" = i64, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order submitted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid state", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Exceeds sales order quantity", body = crate::errors::ErrorResponse),
    ),
    tag = "Work Orders"
)]
pub async fn submit_work_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.work_orders.submit(id).await?;
    Ok(success_response(detail))
}

#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/cancel",
    summary = "Cancel work order",
    params(("id" = i64, Path, description = "Work order ID")),
    responses(
        (status = 200, description = "Work order cancelled", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Stopped or referenced by submitted documents", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Work Orders"
)]
pub async fn cancel_work_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let detail = state.services.work_orders.cancel(id).await?;
    Ok(success_response(detail))
}

/// Stop or resume a submitted work order
#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/status",
    summary = "Stop or resume work order",
    params(("id" = i64, Path, description = "Work order ID")),
    request_body = WorkOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid status transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Work Orders"
)]
pub async fn set_work_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<WorkOrderStatusRequest>,
) -> Result<Response, ApiError> {
    let action: StopAction = parse_enum("status", &payload.status)?;
    let detail = state.services.work_orders.stop_unstop(id, action).await?;
    Ok(success_response(detail))
}

/// Make and save a draft stock entry for the work order
#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/stock-entries",
    summary = "Make stock entry",
    params(("id" = i64, Path, description = "Work order ID")),
    request_body = MakeStockEntryRequest,
    responses(
        (status = 201, description = "Draft stock entry created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Work order not open", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Stock Entries"
)]
pub async fn make_stock_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MakeStockEntryRequest>,
) -> Result<Response, ApiError> {
    let purpose = parse_enum("purpose", &payload.purpose)?;
    let service = &state.services.stock_entries;

    let draft = service.make_stock_entry(id, purpose, payload.qty).await?;
    let created = service.insert(draft).await?;
    Ok(created_response(created))
}

/// Make and save a draft timesheet for the work order's pending operations
#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/timesheets",
    summary = "Make timesheet",
    params(("id" = i64, Path, description = "Work order ID")),
    request_body = MakeTimesheetRequest,
    responses(
        (status = 201, description = "Draft timesheet created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "No pending operations", body = crate::errors::ErrorResponse),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "Timesheets"
)]
pub async fn make_timesheet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Option<Json<MakeTimesheetRequest>>,
) -> Result<Response, ApiError> {
    let company = payload.and_then(|Json(body)| body.company);
    let service = &state.services.timesheets;

    let draft = service.make_timesheet(id, company).await?;
    let created = service.insert(draft).await?;
    Ok(created_response(created))
}
