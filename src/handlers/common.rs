use crate::{errors::ApiError, ApiResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::str::FromStr;
use validator::Validate;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Parses a display-string enum from a request field.
pub fn parse_enum<T: FromStr>(field: &str, value: &str) -> Result<T, ApiError> {
    T::from_str(value).map_err(|_| ApiError::BadRequest {
        message: format!("Unknown {}: {}", field, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::StockEntryPurpose;

    #[test]
    fn parse_enum_reports_field() {
        let purpose: StockEntryPurpose = parse_enum("purpose", "Manufacture").unwrap();
        assert_eq!(purpose, StockEntryPurpose::Manufacture);

        let err = parse_enum::<StockEntryPurpose>("purpose", "Assemble").unwrap_err();
        assert!(err.to_string().contains("Unknown purpose: Assemble"));
    }
}
