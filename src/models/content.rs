//! Rule content from the content repository and the enriched rule
//! returned to clients.

use serde::{Deserialize, Serialize};

use super::report::RuleOnReport;

/// Descriptive metadata for one (rule id, error key) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleContent {
    pub rule_id: String,
    pub error_key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub generic: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub resolution: String,
    #[serde(default)]
    pub more_info: String,
    #[serde(default)]
    pub total_risk: i32,
    #[serde(default)]
    pub risk_of_change: i32,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Only visible to allow-listed organizations.
    #[serde(default)]
    pub internal: bool,
    /// Relevant to OSD customers (audience eligibility).
    #[serde(default)]
    pub osd_customer: bool,
    #[serde(default)]
    pub publish_date: String,
}

/// A rule hit joined with its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleWithContent {
    pub rule_id: String,
    pub error_key: String,
    pub created_at: String,
    pub description: String,
    pub generic: String,
    pub reason: String,
    pub resolution: String,
    pub more_info: String,
    pub total_risk: i32,
    pub risk_of_change: i32,
    pub disabled: bool,
    pub disable_feedback: String,
    pub disabled_at: String,
    pub internal: bool,
    pub user_vote: i32,
    pub extra_data: serde_json::Value,
    pub tags: Vec<String>,
}

impl RuleWithContent {
    pub fn join(hit: &RuleOnReport, content: &RuleContent) -> Self {
        Self {
            rule_id: hit.module.clone(),
            error_key: hit.error_key.clone(),
            created_at: hit.created_at.clone(),
            description: content.description.clone(),
            generic: content.generic.clone(),
            reason: content.reason.clone(),
            resolution: content.resolution.clone(),
            more_info: content.more_info.clone(),
            total_risk: content.total_risk,
            risk_of_change: content.risk_of_change,
            disabled: hit.disabled,
            disable_feedback: hit.disable_feedback.clone(),
            disabled_at: hit.disabled_at.clone(),
            internal: content.internal,
            user_vote: hit.user_vote,
            extra_data: hit.template_data.clone(),
            tags: content.tags.clone(),
        }
    }
}
