//! API error types with structured JSON responses.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::content::{ContentError, RefreshError};
use crate::services::Backend;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Authentication required")]
    Unauthorized,
    #[error("{0} is unavailable")]
    ServiceUnavailable(Backend),
    #[error("Rule content is not available in time")]
    ContentTimeout,
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    /// Error response from a backend, forwarded unchanged.
    #[error("Upstream returned {status}")]
    Upstream { status: u16, body: Bytes },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "AUTH_REQUIRED",
                "Authentication required".to_string(),
            ),
            ApiError::ServiceUnavailable(backend) => {
                tracing::error!(%backend, "Backend unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    match backend {
                        Backend::Aggregator => "AGGREGATOR_UNAVAILABLE",
                        Backend::Content => "CONTENT_UNAVAILABLE",
                        Backend::Membership => "IDENTITY_SERVICE_UNAVAILABLE",
                    },
                    format!("{backend} is unreachable"),
                )
            }
            ApiError::ContentTimeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CONTENT_TIMEOUT",
                "Rule content directory is not available yet".to_string(),
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::PermissionDenied(detail) => (
                StatusCode::FORBIDDEN,
                "PERMISSION_DENIED",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Upstream { status, body } => {
                return upstream_response(*status, body.clone());
            }
        };

        let body = ErrorBody {
            status: "error",
            error: ErrorDetail { code, message },
        };

        (status, Json(body)).into_response()
    }
}

/// Replay a backend error response: original status, original body.
fn upstream_response(status: u16, body: Bytes) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Timeout => ApiError::ContentTimeout,
            ContentError::LockPoisoned => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<RefreshError> for ApiError {
    fn from(err: RefreshError) -> Self {
        match err {
            RefreshError::Transport(_) => ApiError::ServiceUnavailable(Backend::Content),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
