//! `GET /org_overview`: counts of hitting rules by risk and by tag.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::pipeline::compute_overview;
use crate::pipeline::overview::OverviewSummary;

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub overview: OverviewSummary,
}

pub async fn org_overview(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<OverviewResponse>, ApiError> {
    let org_id = identity.org_id.as_str();
    let clusters = ctx.resolver.cluster_ids(org_id).await?;

    let overview = compute_overview(
        org_id,
        &identity.user_id,
        &clusters,
        &ctx.aggregator,
        ctx.content.as_ref(),
    )
    .await?;

    Ok(Json(OverviewResponse {
        status: "ok",
        overview: overview.summary(),
    }))
}
