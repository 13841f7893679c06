//! HTTP response types and error mapping
//!
//! Endpoints return their payload types directly; this module maps
//! [`AppError`] onto status codes and a uniform error body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::AppError;

/// Error body returned for every failed request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound { message } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::PermissionDenied { message } => (StatusCode::FORBIDDEN, message.clone()),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database operation failed".to_string(),
            ),
            AppError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Storage operation failed".to_string(),
            ),
            AppError::ExternalService { .. } | AppError::Http(_) => (
                StatusCode::BAD_GATEWAY,
                "External service communication failed".to_string(),
            ),
            AppError::Configuration { .. } | AppError::Internal { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
