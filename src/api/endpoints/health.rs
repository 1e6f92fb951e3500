//! Liveness endpoint.

use axum::Json;

use crate::api::types::StatusOnly;

/// `GET /`: the gateway is up.
pub async fn check() -> Json<StatusOnly> {
    Json(StatusOnly::ok())
}
