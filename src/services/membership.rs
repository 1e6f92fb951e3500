//! Organization membership service: which clusters belong to an org.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use super::make_url;
use crate::models::{ClusterInfo, ClusterSet};

const ORGANIZATION_CLUSTERS_ENDPOINT: &str = "organizations/{org_id}/clusters";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MembershipError {
    #[error("membership service unreachable: {0}")]
    Transport(String),
    #[error("membership service returned {0}")]
    Status(u16),
    #[error("unexpected membership service payload: {0}")]
    Decode(String),
    #[error("invalid membership service URL")]
    InvalidUrl,
}

/// Cluster membership lookup for an organization.
#[async_trait]
pub trait MembershipService: Send + Sync {
    /// Clusters of `org_id`, leaving out any whose status is listed in
    /// `excluded_statuses`.
    async fn clusters_for_org(
        &self,
        org_id: &str,
        excluded_statuses: &[&str],
    ) -> Result<ClusterSet, MembershipError>;
}

#[derive(Deserialize)]
struct ClustersResponse {
    clusters: Vec<ClusterInfo>,
}

pub struct HttpMembershipClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMembershipClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl MembershipService for HttpMembershipClient {
    async fn clusters_for_org(
        &self,
        org_id: &str,
        excluded_statuses: &[&str],
    ) -> Result<ClusterSet, MembershipError> {
        let mut url = make_url(&self.base_url, ORGANIZATION_CLUSTERS_ENDPOINT, &[org_id])
            .ok_or(MembershipError::InvalidUrl)?;
        if !excluded_statuses.is_empty() {
            url.query_pairs_mut()
                .append_pair("exclude_status", &excluded_statuses.join(","));
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MembershipError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MembershipError::Status(status.as_u16()));
        }

        let parsed: ClustersResponse = response
            .json()
            .await
            .map_err(|e| MembershipError::Decode(e.to_string()))?;

        // The service is asked to exclude these already; drop any that slip through.
        let clusters = parsed
            .clusters
            .into_iter()
            .filter(|c| {
                c.status
                    .as_deref()
                    .map_or(true, |s| !excluded_statuses.contains(&s))
            })
            .collect();

        Ok(ClusterSet::from_records(clusters))
    }
}

/// Mock membership service for testing: fixed response, counts calls.
#[cfg(test)]
pub struct MockMembership {
    response: Result<ClusterSet, MembershipError>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockMembership {
    pub fn returning(set: ClusterSet) -> Self {
        Self {
            response: Ok(set),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing(err: MembershipError) -> Self {
        Self {
            response: Err(err),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl MembershipService for MockMembership {
    async fn clusters_for_org(
        &self,
        _org_id: &str,
        _excluded_statuses: &[&str],
    ) -> Result<ClusterSet, MembershipError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cluster::{STATUS_ARCHIVED, STATUS_DEPROVISIONED};
    use crate::services::aggregator::tests::{dead_url, serve};
    use axum::extract::{Path, Query};
    use axum::routing::get;
    use axum::{Json, Router};
    use std::collections::HashMap;

    #[tokio::test]
    async fn lists_clusters_and_sends_excluded_statuses() {
        let app = Router::new().route(
            "/api/v1/organizations/:org/clusters",
            get(
                |Path(org): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(org, "42");
                    assert_eq!(q["exclude_status"], "Deprovisioned,Archived");
                    Json(serde_json::json!({
                        "clusters": [
                            {"id": "c-1", "display_name": "prod", "status": "Active"},
                            {"id": "c-2", "display_name": "old", "status": "Archived"},
                            {"id": "c-3", "display_name": "dev"}
                        ]
                    }))
                },
            ),
        );
        let base = serve(app).await;
        let client = HttpMembershipClient::new(reqwest::Client::new(), base);

        let set = client
            .clusters_for_org("42", &[STATUS_DEPROVISIONED, STATUS_ARCHIVED])
            .await
            .unwrap();
        assert_eq!(set.ids(), vec!["c-1".to_string(), "c-3".to_string()]);
        assert_eq!(set.display_names["c-1"], "prod");
    }

    #[tokio::test]
    async fn unreachable_service_is_transport_error() {
        let client = HttpMembershipClient::new(reqwest::Client::new(), dead_url().await);
        let result = client.clusters_for_org("42", &[]).await;
        assert!(matches!(result, Err(MembershipError::Transport(_))));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let app = Router::new().route(
            "/api/v1/organizations/:org/clusters",
            get(|| async { axum::http::StatusCode::BAD_GATEWAY }),
        );
        let client = HttpMembershipClient::new(reqwest::Client::new(), serve(app).await);
        let result = client.clusters_for_org("42", &[]).await;
        assert_eq!(result, Err(MembershipError::Status(502)));
    }
}
