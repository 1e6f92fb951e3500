//! Cluster identity and organization cluster sets.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription statuses excluded when listing an organization's clusters.
pub const STATUS_DEPROVISIONED: &str = "Deprovisioned";
pub const STATUS_ARCHIVED: &str = "Archived";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Clusters belonging to an organization, with display names keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterSet {
    pub clusters: Vec<ClusterInfo>,
    pub display_names: HashMap<String, String>,
}

impl ClusterSet {
    /// Build a set from records, taking display names from the records.
    pub fn from_records(clusters: Vec<ClusterInfo>) -> Self {
        let display_names = clusters
            .iter()
            .map(|c| (c.id.clone(), c.display_name.clone()))
            .collect();
        Self {
            clusters,
            display_names,
        }
    }

    /// Build a set from bare ids. Display names are empty strings.
    pub fn from_ids(ids: Vec<String>) -> Self {
        let clusters = ids
            .into_iter()
            .map(|id| ClusterInfo {
                id,
                ..Default::default()
            })
            .collect();
        Self::from_records(clusters)
    }

    pub fn ids(&self) -> Vec<String> {
        self.clusters.iter().map(|c| c.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

/// Cluster names are UUIDs; returns the canonical hyphenated form.
pub fn validate_cluster_name(raw: &str) -> Result<String, uuid::Error> {
    Uuid::parse_str(raw).map(|id| id.hyphenated().to_string())
}

/// Parse a comma-separated cluster list, validating every entry.
pub fn parse_cluster_list(raw: &str) -> Result<Vec<String>, uuid::Error> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(validate_cluster_name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUSTER_A: &str = "34c3ecc5-624a-49a5-bab8-4fdc5e51a266";
    const CLUSTER_B: &str = "74ae54aa-6577-4e80-85e7-697cb646ff37";

    #[test]
    fn from_ids_fills_empty_display_names() {
        let set = ClusterSet::from_ids(vec![CLUSTER_A.into(), CLUSTER_B.into()]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.display_names[CLUSTER_A], "");
        assert_eq!(set.display_names[CLUSTER_B], "");
        assert_eq!(set.ids(), vec![CLUSTER_A.to_string(), CLUSTER_B.to_string()]);
    }

    #[test]
    fn from_records_keeps_display_names() {
        let set = ClusterSet::from_records(vec![ClusterInfo {
            id: CLUSTER_A.into(),
            display_name: "prod-east".into(),
            status: None,
        }]);
        assert_eq!(set.display_names[CLUSTER_A], "prod-east");
    }

    #[test]
    fn validate_cluster_name_rejects_garbage() {
        assert!(validate_cluster_name("not-a-cluster").is_err());
        assert_eq!(validate_cluster_name(CLUSTER_A).unwrap(), CLUSTER_A);
    }

    #[test]
    fn parse_cluster_list_validates_each_entry() {
        let list = format!("{CLUSTER_A},{CLUSTER_B}");
        assert_eq!(parse_cluster_list(&list).unwrap().len(), 2);
        assert!(parse_cluster_list(&format!("{CLUSTER_A},bogus")).is_err());
    }
}
