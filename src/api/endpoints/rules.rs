//! `GET /report/:cluster/rule/:rule`: a single rule hit with its content.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use serde::Serialize;

use super::{cluster_param, lenient_bool_param};
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, Identity};
use crate::models::RuleWithContent;
use crate::pipeline::filter::{classify, AudienceEligible, FilterOutcome, FilterPolicy};

#[derive(Debug, Serialize)]
pub struct RuleResponse {
    pub status: &'static str,
    pub report: RuleWithContent,
}

/// Split a `rule_id|error_key` selector.
fn parse_selector(raw: &str) -> Result<(&str, &str), ApiError> {
    match raw.split_once('|') {
        Some((rule_id, error_key)) if !rule_id.is_empty() && !error_key.is_empty() => {
            Ok((rule_id, error_key))
        }
        _ => Err(ApiError::BadRequest(format!(
            "rule selector must be rule_id|error_key, got {raw:?}"
        ))),
    }
}

/// Disabled hits are returned too. A hit filtered out by the audience
/// check is 404; internal content that passes it is refused with 403 for
/// organizations that may not see it.
pub async fn rule(
    State(ctx): State<ApiContext>,
    Extension(identity): Extension<Identity>,
    Path((cluster, selector)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<RuleResponse>, ApiError> {
    let cluster = cluster_param(&cluster)?;
    let (rule_id, error_key) = parse_selector(&selector)?;
    let osd_eligible = lenient_bool_param(&query, "osd_eligible");
    let org_id = identity.org_id.as_str();

    let hit = ctx
        .aggregator
        .rule(org_id, &cluster, &identity.user_id, rule_id, error_key)
        .await?;

    let content = ctx
        .content
        .content_for(&hit.module, &hit.error_key)?
        .ok_or_else(|| ApiError::NotFound("Rule was not found".into()))?;

    let mut policy = FilterPolicy::new(true);
    if osd_eligible {
        policy = policy.with(AudienceEligible);
    }
    if classify(&hit, Some(&content), &policy) != FilterOutcome::Visible {
        return Err(ApiError::NotFound("Rule was not found".into()));
    }

    if content.internal && !ctx.internal_rules_allowed(org_id) {
        tracing::warn!(org_id, rule = %hit.module, "Internal rule requested by organization without access");
        return Err(ApiError::PermissionDenied(
            "This rule is not available for your organization".into(),
        ));
    }

    Ok(Json(RuleResponse {
        status: "ok",
        report: RuleWithContent::join(&hit, &content),
    }))
}
