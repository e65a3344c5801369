use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use fightsync_core::error::AppError;

use crate::dto::ErrorResponse;

/// Handler error: an [`AppError`] from the layers below, or a request the
/// handler rejected itself.
pub enum ApiError {
    App(AppError),
    BadRequest(String),
    /// A feature this instance was started without.
    Unavailable(String),
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = match self {
            ApiError::BadRequest(message) => {
                return reply(StatusCode::BAD_REQUEST, "bad_request", message);
            }
            ApiError::Unavailable(message) => {
                return reply(StatusCode::SERVICE_UNAVAILABLE, "unavailable", message);
            }
            ApiError::App(err) => err,
        };

        let (status, error_type) = match &err {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::SerializationError(_) => (StatusCode::BAD_REQUEST, "serialization_error"),
            AppError::DatabaseError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            AppError::StorageUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
            }
            AppError::ConfigError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded"),
            AppError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "Request failed");
        }

        reply(status, error_type, err.to_string())
    }
}

fn reply(status: StatusCode, error: &str, message: String) -> Response {
    let body = ErrorResponse {
        error: error.to_string(),
        message,
    };
    (status, axum::Json(body)).into_response()
}
