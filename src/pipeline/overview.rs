//! Organization overview: which risks and tags are hitting the org's clusters.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::api::error::ApiError;
use crate::content::ContentLookup;
use crate::services::AggregatorClient;

/// Risk scores and tags of every content-bearing hit across the
/// organization, plus the number of clusters with at least one hit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub clusters_hit: usize,
    pub total_risks: Vec<i32>,
    pub tags: Vec<String>,
}

/// Client-facing rendering of an [`Overview`].
#[derive(Debug, Serialize)]
pub struct OverviewSummary {
    pub clusters_hit: usize,
    pub hit_by_risk: BTreeMap<i32, usize>,
    pub hit_by_tag: BTreeMap<String, usize>,
}

impl Overview {
    pub fn summary(&self) -> OverviewSummary {
        let mut hit_by_risk = BTreeMap::new();
        for risk in &self.total_risks {
            *hit_by_risk.entry(*risk).or_insert(0) += 1;
        }
        let mut hit_by_tag = BTreeMap::new();
        for tag in &self.tags {
            *hit_by_tag.entry(tag.clone()).or_insert(0) += 1;
        }
        OverviewSummary {
            clusters_hit: self.clusters_hit,
            hit_by_risk,
            hit_by_tag,
        }
    }
}

/// Walk every cluster's report and collect risks and tags.
///
/// Content is looked up without the disabled, audience or internal
/// filters. A cluster whose report the aggregator refuses (no report
/// stored yet, for example) is skipped; an unreachable aggregator or a
/// content timeout fails the whole overview.
pub async fn compute_overview(
    org_id: &str,
    user_id: &str,
    clusters: &[String],
    aggregator: &AggregatorClient,
    lookup: &dyn ContentLookup,
) -> Result<Overview, ApiError> {
    let mut overview = Overview::default();

    for cluster in clusters {
        let report = match aggregator.report(org_id, cluster, user_id).await {
            Ok(report) => report,
            Err(ApiError::Upstream { status, .. }) => {
                tracing::info!(org_id, cluster = %cluster, status, "Skipping cluster without report");
                continue;
            }
            Err(e) => return Err(e),
        };

        if report.report.is_empty() {
            continue;
        }
        overview.clusters_hit += 1;

        for hit in &report.report {
            match lookup.content_for(&hit.module, &hit.error_key)? {
                Some(content) => {
                    overview.total_risks.push(content.total_risk);
                    overview.tags.extend(content.tags);
                }
                None => {
                    tracing::warn!(
                        rule = %hit.module,
                        error_key = %hit.error_key,
                        "Rule content not found for overview"
                    );
                }
            }
        }
    }

    tracing::debug!(
        org_id,
        clusters_hit = overview.clusters_hit,
        risks = overview.total_risks.len(),
        "Organization overview computed"
    );
    Ok(overview)
}
