use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StateSet Manufacturing API",
        version = "0.2.1",
        description = r#"
# StateSet Manufacturing API

Work orders built from bills of materials, raw-material reservation in
warehouse bins, stock entries for material transfer and manufacture, and
operation timesheets.

## Document lifecycle

Work orders, stock entries, timesheets and sales orders move through
`Draft` → `Submitted` → `Cancelled`. Only submitted documents affect stock
counters.

## Error Handling

Errors share one response format:

```json
{
  "error": "Conflict",
  "message": "Stock over production: Manufacture quantity (3) cannot be greater than planned quantity (2) in Work Order 7",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

Over-production is reported with `409 Conflict`, insufficient stock with
`422 Unprocessable Entity`.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Work Orders", description = "Work order lifecycle"),
        (name = "Stock Entries", description = "Material transfer and manufacture"),
        (name = "Timesheets", description = "Operation time logging"),
        (name = "Stock", description = "Per item/warehouse stock counters"),
        (name = "Settings", description = "Manufacturing settings"),
        (name = "Health", description = "Health check endpoints")
    ),
    paths(
        // Work orders
        crate::handlers::work_orders::create_work_order,
        crate::handlers::work_orders::get_work_order,
        crate::handlers::work_orders::update_work_order,
        crate::handlers::work_orders::submit_work_order,
        crate::handlers::work_orders::cancel_work_order,
        crate::handlers::work_orders::set_work_order_status,
        crate::handlers::work_orders::make_stock_entry,
        crate::handlers::work_orders::make_timesheet,

        // Stock entries
        crate::handlers::stock_entries::get_stock_entry,
        crate::handlers::stock_entries::submit_stock_entry,
        crate::handlers::stock_entries::cancel_stock_entry,

        // Timesheets
        crate::handlers::timesheets::get_timesheet,
        crate::handlers::timesheets::submit_timesheet,
        crate::handlers::timesheets::cancel_timesheet,

        // Stock counters and settings
        crate::handlers::bins::get_bin,
        crate::handlers::settings::get_settings,
        crate::handlers::settings::update_settings,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Request types
            crate::services::work_orders::NewWorkOrderArgs,
            crate::services::work_orders::WorkOrderChanges,
            crate::handlers::work_orders::WorkOrderStatusRequest,
            crate::handlers::work_orders::MakeStockEntryRequest,
            crate::handlers::work_orders::MakeTimesheetRequest,
            crate::services::settings::UpdateSettingsRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

/// Serves the generated document at `/api-docs/openapi.json`.
pub fn openapi_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDocV1::openapi()) }),
    )
}
