//! Identity extraction middleware.
//!
//! Decodes the `x-rh-identity` header and injects `Identity` into request
//! extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{Identity, IDENTITY_HEADER};

/// Require a decodable identity header.
pub async fn require_identity(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_identity_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_identity_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let raw = req
        .headers()
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::info!(path = %req.uri().path(), "Request without identity header");
            ApiError::Unauthorized
        })?;

    let identity = Identity::from_header(raw)?;
    tracing::debug!(org_id = %identity.org_id, "Identity accepted");

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}
