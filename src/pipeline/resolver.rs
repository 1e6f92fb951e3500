//! Organization → cluster set resolution.
//!
//! Primary source is the membership service. If it fails (or is not
//! configured) the aggregator's own per-organization listing is used,
//! unless the fallback is switched off. The two sources are never merged.

use std::sync::Arc;

use crate::api::error::ApiError;
use crate::models::cluster::{STATUS_ARCHIVED, STATUS_DEPROVISIONED};
use crate::models::ClusterSet;
use crate::services::{AggregatorClient, Backend, MembershipService};

const EXCLUDED_STATUSES: &[&str] = &[STATUS_DEPROVISIONED, STATUS_ARCHIVED];

#[derive(Clone)]
pub struct ClusterResolver {
    aggregator: AggregatorClient,
    membership: Option<Arc<dyn MembershipService>>,
    use_fallback: bool,
}

impl ClusterResolver {
    pub fn new(
        aggregator: AggregatorClient,
        membership: Option<Arc<dyn MembershipService>>,
        use_fallback: bool,
    ) -> Self {
        Self {
            aggregator,
            membership,
            use_fallback,
        }
    }

    /// Cluster ids of the organization.
    pub async fn cluster_ids(&self, org_id: &str) -> Result<Vec<String>, ApiError> {
        Ok(self.clusters(org_id).await?.ids())
    }

    /// Cluster records and display names of the organization.
    ///
    /// Display names are empty strings when the aggregator fallback
    /// answered, since it has no display-name source.
    pub async fn clusters(&self, org_id: &str) -> Result<ClusterSet, ApiError> {
        if let Some(membership) = &self.membership {
            match membership.clusters_for_org(org_id, EXCLUDED_STATUSES).await {
                Ok(set) => {
                    tracing::info!(
                        org_id,
                        count = set.len(),
                        "Clusters retrieved from membership service"
                    );
                    return Ok(set);
                }
                Err(e) => {
                    tracing::error!(org_id, error = %e, "Error accessing membership service");
                }
            }
        }

        if !self.use_fallback {
            tracing::error!(org_id, "Membership service unavailable and fallback disabled");
            return Err(ApiError::ServiceUnavailable(Backend::Membership));
        }

        tracing::info!(org_id, "Using aggregator cluster listing as fallback");
        let ids = self.aggregator.clusters_for_org(org_id).await?;
        Ok(ClusterSet::from_ids(ids))
    }
}
