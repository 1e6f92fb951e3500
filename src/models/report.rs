//! Report payloads as produced by the aggregation store.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One rule evaluation result for a cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleOnReport {
    /// Rule module, e.g. `ccx_rules_ocp.external.rules.nodes_requirements_check`.
    #[serde(rename = "component")]
    pub module: String,
    #[serde(rename = "key")]
    pub error_key: String,
    #[serde(default)]
    pub user_vote: i32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub disable_feedback: String,
    #[serde(default)]
    pub disabled_at: String,
    /// Opaque evaluation metadata, passed through to the client.
    #[serde(rename = "details", default)]
    pub template_data: serde_json::Value,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportMeta {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub last_checked_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gathered_at: Option<String>,
}

/// Report for a single cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportResponse {
    #[serde(default)]
    pub meta: ReportMeta,
    #[serde(rename = "reports", default)]
    pub report: Vec<RuleOnReport>,
}

/// Metainformation about a stored report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportMetainfo {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub last_checked_at: String,
    #[serde(default)]
    pub stored_at: String,
}

/// Reports for a list of clusters, forwarded to the client as-is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterReports {
    #[serde(default)]
    pub clusters: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub reports: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub generated_at: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_on_report_uses_aggregator_field_names() {
        let json = r#"{
            "component": "ccx_rules_ocp.external.rules.nodes_kubelet_version_check",
            "key": "NODE_KUBELET_VERSION",
            "disabled": true,
            "details": {"nodes": ["node-1"]},
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let rule: RuleOnReport = serde_json::from_str(json).unwrap();
        assert_eq!(rule.error_key, "NODE_KUBELET_VERSION");
        assert!(rule.disabled);
        assert_eq!(rule.user_vote, 0);
        assert_eq!(rule.template_data["nodes"][0], "node-1");
    }

    #[test]
    fn report_response_tolerates_missing_meta() {
        let report: ReportResponse = serde_json::from_str(r#"{"reports": []}"#).unwrap();
        assert_eq!(report.meta.count, 0);
        assert!(report.report.is_empty());
    }
}
