use serde::{Deserialize, Serialize};

/// Rule group configuration published by the content repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleGroup {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
