//! HTTP client for the results aggregation store.
//!
//! Every call builds its URL from a fixed endpoint template, reads the
//! whole body, and then either decodes it or hands the upstream status
//! and body back unchanged as `ApiError::Upstream`.

use axum::body::Bytes;
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{body_error, make_url, transport_error, Backend};
use crate::api::error::ApiError;
use crate::models::{ClusterReports, ReportMetainfo, ReportResponse, RuleOnReport};

pub const REPORT_ENDPOINT: &str =
    "organizations/{org_id}/clusters/{cluster}/users/{user_id}/report";
pub const REPORT_METAINFO_ENDPOINT: &str =
    "organizations/{org_id}/clusters/{cluster}/users/{user_id}/report/info";
pub const REPORTS_FOR_CLUSTER_LIST_ENDPOINT: &str =
    "organizations/{org_id}/clusters/{cluster_list}/reports";
pub const REPORTS_FOR_CLUSTER_LIST_PAYLOAD_ENDPOINT: &str =
    "organizations/{org_id}/clusters/reports";
pub const RULE_ENDPOINT: &str =
    "organizations/{org_id}/clusters/{cluster}/users/{user_id}/rules/{rule_selector}";
pub const CLUSTERS_FOR_ORGANIZATION_ENDPOINT: &str = "organizations/{org_id}/clusters";

#[derive(Deserialize)]
struct ReportEnvelope {
    report: ReportResponse,
}

#[derive(Deserialize)]
struct MetainfoEnvelope {
    metainfo: ReportMetainfo,
}

#[derive(Deserialize)]
struct RuleEnvelope {
    report: RuleOnReport,
}

#[derive(Deserialize)]
struct ClustersEnvelope {
    clusters: Vec<String>,
}

#[derive(Clone)]
pub struct AggregatorClient {
    client: reqwest::Client,
    base_url: Url,
}

impl AggregatorClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Report for a single cluster.
    pub async fn report(
        &self,
        org_id: &str,
        cluster: &str,
        user_id: &str,
    ) -> Result<ReportResponse, ApiError> {
        let url = self.url(REPORT_ENDPOINT, &[org_id, cluster, user_id])?;
        let envelope: ReportEnvelope = self.call(Method::GET, url, None).await?;
        tracing::info!(
            org_id,
            cluster,
            count = envelope.report.report.len(),
            "Report read from aggregator"
        );
        Ok(envelope.report)
    }

    /// Metainformation about the stored report of a single cluster.
    pub async fn report_metainfo(
        &self,
        org_id: &str,
        cluster: &str,
        user_id: &str,
    ) -> Result<ReportMetainfo, ApiError> {
        let url = self.url(REPORT_METAINFO_ENDPOINT, &[org_id, cluster, user_id])?;
        let envelope: MetainfoEnvelope = self.call(Method::GET, url, None).await?;
        Ok(envelope.metainfo)
    }

    /// Reports for an explicit list of clusters, passed in the URL.
    pub async fn reports_for_clusters(
        &self,
        org_id: &str,
        clusters: &[String],
    ) -> Result<ClusterReports, ApiError> {
        let cluster_list = clusters.join(",");
        let url = self.url(REPORTS_FOR_CLUSTER_LIST_ENDPOINT, &[org_id, &cluster_list])?;
        let reports: ClusterReports = self.call(Method::GET, url, None).await?;
        tracing::info!(org_id, clusters = reports.reports.len(), "Reports read from aggregator");
        Ok(reports)
    }

    /// Reports for a list of clusters supplied as a JSON request body.
    pub async fn reports_for_clusters_payload(
        &self,
        org_id: &str,
        body: Bytes,
    ) -> Result<ClusterReports, ApiError> {
        let url = self.url(REPORTS_FOR_CLUSTER_LIST_PAYLOAD_ENDPOINT, &[org_id])?;
        let reports: ClusterReports = self.call(Method::POST, url, Some(body)).await?;
        tracing::info!(org_id, clusters = reports.reports.len(), "Reports read from aggregator");
        Ok(reports)
    }

    /// A single rule hit on a cluster's report.
    pub async fn rule(
        &self,
        org_id: &str,
        cluster: &str,
        user_id: &str,
        rule_id: &str,
        error_key: &str,
    ) -> Result<RuleOnReport, ApiError> {
        let selector = format!("{rule_id}|{error_key}");
        let url = self.url(RULE_ENDPOINT, &[org_id, cluster, user_id, &selector])?;
        let envelope: RuleEnvelope = self.call(Method::GET, url, None).await?;
        Ok(envelope.report)
    }

    /// Cluster ids the aggregator has results for in this organization.
    pub async fn clusters_for_org(&self, org_id: &str) -> Result<Vec<String>, ApiError> {
        tracing::info!(org_id, "Retrieving cluster IDs from aggregator");
        let url = self.url(CLUSTERS_FOR_ORGANIZATION_ENDPOINT, &[org_id])?;
        let envelope: ClustersEnvelope = self.call(Method::GET, url, None).await?;
        Ok(envelope.clusters)
    }

    fn url(&self, template: &str, params: &[&str]) -> Result<Url, ApiError> {
        make_url(&self.base_url, template, params)
            .ok_or_else(|| ApiError::Internal(format!("cannot build URL for {template}")))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> Result<T, ApiError> {
        tracing::debug!(%url, "Connecting to aggregator");

        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%url, error = %e, "Aggregator request failed");
            transport_error(e, Backend::Aggregator)
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| body_error(e, Backend::Aggregator))?;

        if !status.is_success() {
            tracing::info!(%url, status = status.as_u16(), "Aggregator returned an error response");
            return Err(ApiError::Upstream {
                status: status.as_u16(),
                body: bytes,
            });
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::Internal(format!("decoding aggregator response: {e}")))
    }
}
