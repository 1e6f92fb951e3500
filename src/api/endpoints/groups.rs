//! `GET /groups`: latest rule groups published by the content refresher.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::RuleGroup;

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub status: &'static str,
    pub groups: Vec<RuleGroup>,
}

/// Never waits on the refresher; before the first refresh the list is empty.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<GroupsResponse>, ApiError> {
    let groups = ctx.groups.latest().map_err(|e| {
        tracing::error!(error = %e, "Rule groups unavailable");
        ApiError::from(e)
    })?;
    Ok(Json(GroupsResponse {
        status: "ok",
        groups,
    }))
}
