//! Error handling module for the Porto API gateway.
//!
//! Provides a centralized error type with mapping to HTTP status codes and the
//! `{"detail": ...}` response body the frontend expects.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error type.
///
/// Every handler translates upstream failures into one of these at its own
/// boundary; no raw store or provider error ever reaches the caller.
#[derive(Debug)]
pub enum AppError {
    /// No or invalid credential on an endpoint requiring one
    Unauthorized(String),
    /// Valid credential, insufficient privilege
    Forbidden(String),
    /// Missing required field, malformed payload, out-of-bounds parameter
    BadRequest(String),
    /// Id or slug has no matching row
    NotFound(String),
    /// Upstream failure or a mutation that unexpectedly returned no row
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the detail string returned to the caller.
    pub fn detail(&self) -> &str {
        match self {
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Internal(msg) => msg,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status_code(), self.detail())
    }
}

impl std::error::Error for AppError {}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Upstream request error: {:?}", err);
        AppError::Internal("upstream_request_failed".to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::BadRequest("invalid_json_payload".to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({ "detail": self.detail() });
        (status, Json(body)).into_response()
    }
}
