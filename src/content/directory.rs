//! In-process rule content directory.
//!
//! Replaced wholesale by the refresher, read by every request. Until the
//! first load completes, lookups report `ContentError::Timeout` so callers
//! can tell "not ready" apart from "no content for this rule".

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{ContentError, ContentLookup};
use crate::models::RuleContent;

type RuleKey = (String, String);

#[derive(Default)]
pub struct ContentDirectory {
    rules: RwLock<Option<Arc<HashMap<RuleKey, RuleContent>>>>,
}

impl ContentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an already-loaded directory.
    pub fn with_contents(contents: Vec<RuleContent>) -> Self {
        let directory = Self::new();
        // A fresh lock cannot be poisoned.
        let _ = directory.load(contents);
        directory
    }

    /// Replace the directory contents. Returns the number of entries.
    pub fn load(&self, contents: Vec<RuleContent>) -> Result<usize, ContentError> {
        let map: HashMap<RuleKey, RuleContent> = contents
            .into_iter()
            .map(|c| ((c.rule_id.clone(), c.error_key.clone()), c))
            .collect();
        let count = map.len();

        let mut guard = self.rules.write().map_err(|_| ContentError::LockPoisoned)?;
        *guard = Some(Arc::new(map));
        Ok(count)
    }

    pub fn is_loaded(&self) -> bool {
        self.rules.read().map(|g| g.is_some()).unwrap_or(false)
    }

    fn snapshot(&self) -> Result<Arc<HashMap<RuleKey, RuleContent>>, ContentError> {
        let guard = self.rules.read().map_err(|_| ContentError::LockPoisoned)?;
        guard.clone().ok_or(ContentError::Timeout)
    }
}

impl ContentLookup for ContentDirectory {
    fn content_for(
        &self,
        rule_id: &str,
        error_key: &str,
    ) -> Result<Option<RuleContent>, ContentError> {
        let rules = self.snapshot()?;
        Ok(rules
            .get(&(rule_id.to_string(), error_key.to_string()))
            .cloned())
    }
}
