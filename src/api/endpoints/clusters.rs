//! `GET /clusters`: the caller organization's clusters.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::ClusterInfo;

#[derive(Debug, Serialize)]
pub struct ClustersResponse {
    pub status: &'static str,
    pub clusters: Vec<ClusterInfo>,
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ClustersResponse>, ApiError> {
    let set = ctx.resolver.clusters(&identity.org_id).await?;
    Ok(Json(ClustersResponse {
        status: "ok",
        clusters: set.clusters,
    }))
}
