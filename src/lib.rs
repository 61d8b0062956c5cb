//! StateSet Manufacturing Library
//!
//! Work orders, bin reservation bookkeeping, stock entries and operation
//! timesheets on top of sea-orm, exposed through an axum router.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{
    extract::State,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, Instrument};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    /// Builds the service layer on a connection and event channel.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(
            db.clone(),
            config.manufacturing.clone(),
            Some(event_sender.clone()),
        );
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

// Versioned API routes
pub fn api_v1_routes() -> Router<AppState> {
    let work_orders = Router::new()
        .route("/work-orders", post(handlers::work_orders::create_work_order))
        .route(
            "/work-orders/:id",
            get(handlers::work_orders::get_work_order).put(handlers::work_orders::update_work_order),
        )
        .route(
            "/work-orders/:id/submit",
            post(handlers::work_orders::submit_work_order),
        )
        .route(
            "/work-orders/:id/cancel",
            post(handlers::work_orders::cancel_work_order),
        )
        .route(
            "/work-orders/:id/status",
            post(handlers::work_orders::set_work_order_status),
        )
        .route(
            "/work-orders/:id/stock-entries",
            post(handlers::work_orders::make_stock_entry),
        )
        .route(
            "/work-orders/:id/timesheets",
            post(handlers::work_orders::make_timesheet),
        );

    let stock_entries = Router::new()
        .route(
            "/stock-entries/:id",
            get(handlers::stock_entries::get_stock_entry),
        )
        .route(
            "/stock-entries/:id/submit",
            post(handlers::stock_entries::submit_stock_entry),
        )
        .route(
            "/stock-entries/:id/cancel",
            post(handlers::stock_entries::cancel_stock_entry),
        );

    let timesheets = Router::new()
        .route("/timesheets/:id", get(handlers::timesheets::get_timesheet))
        .route(
            "/timesheets/:id/submit",
            post(handlers::timesheets::submit_timesheet),
        )
        .route(
            "/timesheets/:id/cancel",
            post(handlers::timesheets::cancel_timesheet),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(work_orders)
        .merge(stock_entries)
        .merge(timesheets)
        .route(
            "/bins/:item_code/:warehouse",
            get(handlers::bins::get_bin),
        )
        .route(
            "/manufacturing-settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
}

/// Full application router with middleware applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route("/", get(|| async { "stateset-manufacturing up" }))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::openapi_routes())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .with_state(state)
}

fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.should_allow_permissive_cors() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

async fn api_status(State(state): State<AppState>) -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "stateset-manufacturing",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config.environment,
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(State(state): State<AppState>) -> ApiResult<Value> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(e) => {
            error!("Health check database ping failed: {}", e);
            "unhealthy"
        }
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

// Request logging middleware
async fn request_logging_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let start = std::time::Instant::now();

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = next.run(request).instrument(span.clone()).await;

    let status = response.status();
    span.in_scope(|| {
        info!(
            method = %method,
            uri = %uri,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

pub mod prelude {
    pub use crate::db::*;
    pub use crate::errors::*;
    pub use crate::events::*;
    pub use crate::openapi::*;
    pub use crate::services::*;
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_response_wraps_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
    }

    #[test]
    fn validation_errors_carry_messages() {
        let response = ApiResponse::<()>::validation_errors(vec!["qty".into()]);
        assert!(!response.success);
        assert_eq!(response.errors.as_deref(), Some(&["qty".to_string()][..]));
    }
}
