//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::rbac::PermissionDenied;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::allocator::AllocatorError;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but lacking a permission
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request conflicts with current state
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,
}

impl From<AllocatorError> for ApiError {
    fn from(err: AllocatorError) -> Self {
        match err {
            AllocatorError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AllocatorError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            AllocatorError::Store(e) => {
                error!("Stand allocation failed: {}", e);
                ApiError::InternalServerError
            }
        }
    }
}

impl From<PermissionDenied> for ApiError {
    fn from(err: PermissionDenied) -> Self {
        ApiError::Forbidden(err.permission)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::Unauthorized => "Unauthorized".to_string(),
            ApiError::Forbidden(permission) => format!("Missing permission: {}", permission),
            ApiError::NotFound(msg) | ApiError::Conflict(msg) | ApiError::BadRequest(msg) => msg,
            ApiError::InternalServerError => "Internal server error".to_string(),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_allocator_errors_map_to_http_status() {
        let not_found: ApiError = AllocatorError::NotFound(Uuid::nil()).into();
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict: ApiError = AllocatorError::Conflict {
            codes: vec!["A07".to_string(), "A09".to_string()],
        }
        .into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        match conflict {
            ApiError::Conflict(msg) => {
                assert_eq!(msg, "Cannot reduce capacity: stands A07, A09 are occupied")
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let store: ApiError = AllocatorError::Store(sqlx::Error::RowNotFound).into();
        assert_eq!(store.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_failure_hides_details() {
        let err: ApiError = AllocatorError::Store(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, ApiError::InternalServerError));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_permission_denied_is_forbidden() {
        let err: ApiError = PermissionDenied {
            permission: "fairs.delete".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }
}
