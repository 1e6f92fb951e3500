//! Report endpoints.
//!
//! - `GET /report/:cluster`: filtered, content-enriched report
//! - `GET /report/:cluster/info`: report metainformation
//! - `GET /clusters/:cluster_list/reports`: reports for a list of clusters
//! - `POST /clusters/reports`: same, cluster list in the body

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Serialize;

use super::{bool_param, cluster_param, lenient_bool_param};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::cluster::parse_cluster_list;
use crate::models::{ClusterReports, ReportMeta, ReportMetainfo, RuleWithContent};
use crate::pipeline::{filter_rules, FilterPolicy};

#[derive(Debug, Serialize)]
pub struct ReportPayload {
    pub meta: ReportMeta,
    pub data: Vec<RuleWithContent>,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub status: &'static str,
    pub report: ReportPayload,
}

/// `GET /report/:cluster`: one cluster's rule hits joined with content.
///
/// `get_disabled` includes disabled hits; `osd_eligible` keeps only
/// content meant for OSD customers.
pub async fn report(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(cluster): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<ReportResponse>, ApiError> {
    let cluster = cluster_param(&cluster)?;
    let include_disabled = bool_param(&query, "get_disabled")?;
    let osd_eligible = lenient_bool_param(&query, "osd_eligible");
    let org_id = identity.org_id.as_str();

    let aggregator_report = ctx
        .aggregator
        .report(org_id, &cluster, &identity.user_id)
        .await?;

    let policy = FilterPolicy::for_report(
        include_disabled,
        osd_eligible,
        ctx.internal_rules_allowed(org_id),
    );
    let result = filter_rules(&aggregator_report.report, ctx.content.as_ref(), &policy)?;

    tracing::info!(
        org_id,
        cluster = %cluster,
        visible = result.visible.len(),
        no_content = result.no_content,
        disabled = result.disabled,
        "Report filtered"
    );

    let meta = ReportMeta {
        count: result.total_count() as i64,
        ..aggregator_report.meta
    };

    Ok(Json(ReportResponse {
        status: "ok",
        report: ReportPayload {
            meta,
            data: result.visible,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct MetainfoResponse {
    pub status: &'static str,
    pub metainfo: ReportMetainfo,
}

/// `GET /report/:cluster/info`
pub async fn report_info(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(cluster): Path<String>,
) -> Result<Json<MetainfoResponse>, ApiError> {
    let cluster = cluster_param(&cluster)?;
    let metainfo = ctx
        .aggregator
        .report_metainfo(&identity.org_id, &cluster, &identity.user_id)
        .await?;

    Ok(Json(MetainfoResponse {
        status: "ok",
        metainfo,
    }))
}

/// `GET /clusters/:cluster_list/reports`
pub async fn reports_for_list(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path(cluster_list): Path<String>,
) -> Result<Json<ClusterReports>, ApiError> {
    let clusters = parse_cluster_list(&cluster_list)
        .map_err(|_| ApiError::BadRequest(format!("invalid cluster list {cluster_list:?}")))?;
    if clusters.is_empty() {
        return Err(ApiError::BadRequest("cluster list is empty".into()));
    }

    let reports = ctx
        .aggregator
        .reports_for_clusters(&identity.org_id, &clusters)
        .await?;
    Ok(Json(reports))
}

/// `POST /clusters/reports`: body `{"clusters": [...]}`, forwarded as-is.
pub async fn reports_for_payload(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Json<ClusterReports>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("request body with cluster list is required".into()));
    }

    let reports = ctx
        .aggregator
        .reports_for_clusters_payload(&identity.org_id, body)
        .await?;
    Ok(Json(reports))
}
