//! Rule content: the lookup port used by the pipeline, the in-process
//! directory that implements it, the rule-group snapshot and the
//! background refresher that keeps both current.

pub mod directory;
pub mod groups;
pub mod refresher;

pub use directory::ContentDirectory;
pub use groups::{groups_channel, GroupsPublisher, GroupsSnapshot};
pub use refresher::{ContentRefresher, RefreshError};

use crate::models::RuleContent;

/// Errors from a content lookup. "Not found" is not an error; it is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("rule content directory is not available")]
    Timeout,
    #[error("rule content directory lock poisoned")]
    LockPoisoned,
}

/// Synchronous content lookup by (rule id, error key).
pub trait ContentLookup: Send + Sync {
    fn content_for(
        &self,
        rule_id: &str,
        error_key: &str,
    ) -> Result<Option<RuleContent>, ContentError>;
}

/// Mock lookup for tests: fixed contents, optional forced timeout.
#[cfg(test)]
pub struct MockContentLookup {
    contents: Vec<RuleContent>,
    timeout_on: Option<String>,
    pub calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockContentLookup {
    pub fn new(contents: Vec<RuleContent>) -> Self {
        Self {
            contents,
            timeout_on: None,
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Fail with `ContentError::Timeout` when this error key is looked up.
    pub fn with_timeout_on(mut self, error_key: &str) -> Self {
        self.timeout_on = Some(error_key.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[cfg(test)]
impl ContentLookup for MockContentLookup {
    fn content_for(
        &self,
        rule_id: &str,
        error_key: &str,
    ) -> Result<Option<RuleContent>, ContentError> {
        self.calls.lock().unwrap().push(format!("{rule_id}|{error_key}"));
        if self.timeout_on.as_deref() == Some(error_key) {
            return Err(ContentError::Timeout);
        }
        Ok(self
            .contents
            .iter()
            .find(|c| c.rule_id == rule_id && c.error_key == error_key)
            .cloned())
    }
}

/// Content fixture used across module tests.
#[cfg(test)]
pub fn test_content(rule_id: &str, error_key: &str) -> RuleContent {
    RuleContent {
        rule_id: rule_id.to_string(),
        error_key: error_key.to_string(),
        description: format!("{rule_id} {error_key}"),
        total_risk: 2,
        tags: vec!["performance".to_string()],
        ..Default::default()
    }
}
