//! Content filter and enricher.
//!
//! Joins each raw rule hit with its content and sorts it into exactly one
//! of three classes:
//!
//! - `Disabled`: the hit is disabled and the caller did not ask for
//!   disabled hits. Content is not looked up.
//! - `NoContent`: there is no content for the hit, or a content predicate
//!   (audience eligibility, internal access) rejects it.
//! - `Visible`: everything else, returned as a `RuleWithContent`.
//!
//! The three counts always add up to the number of input hits.

use crate::content::{ContentError, ContentLookup};
use crate::models::{RuleContent, RuleOnReport, RuleWithContent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOutcome {
    Visible,
    Disabled,
    NoContent,
}

/// A visibility rule evaluated once content is known for a hit.
pub trait ContentPredicate: Send + Sync {
    fn admits(&self, hit: &RuleOnReport, content: &RuleContent) -> bool;
}

/// Only content flagged for the OSD audience.
pub struct AudienceEligible;

impl ContentPredicate for AudienceEligible {
    fn admits(&self, _hit: &RuleOnReport, content: &RuleContent) -> bool {
        content.osd_customer
    }
}

/// Internal content only for callers entitled to it.
pub struct InternalAccess {
    pub allowed: bool,
}

impl ContentPredicate for InternalAccess {
    fn admits(&self, _hit: &RuleOnReport, content: &RuleContent) -> bool {
        !content.internal || self.allowed
    }
}

/// The disabled rule plus the set of content predicates for one request.
pub struct FilterPolicy {
    include_disabled: bool,
    predicates: Vec<Box<dyn ContentPredicate>>,
}

impl FilterPolicy {
    /// Policy with no content predicates.
    pub fn new(include_disabled: bool) -> Self {
        Self {
            include_disabled,
            predicates: Vec::new(),
        }
    }

    pub fn with(mut self, predicate: impl ContentPredicate + 'static) -> Self {
        self.predicates.push(Box::new(predicate));
        self
    }

    /// Compose the policy for a report request.
    pub fn for_report(include_disabled: bool, osd_eligible_only: bool, internal_allowed: bool) -> Self {
        let mut policy = Self::new(include_disabled).with(InternalAccess {
            allowed: internal_allowed,
        });
        if osd_eligible_only {
            policy = policy.with(AudienceEligible);
        }
        policy
    }

    pub fn skips_disabled(&self, hit: &RuleOnReport) -> bool {
        hit.disabled && !self.include_disabled
    }

    pub fn admits(&self, hit: &RuleOnReport, content: &RuleContent) -> bool {
        self.predicates.iter().all(|p| p.admits(hit, content))
    }
}

/// Classify one hit whose content has already been looked up.
pub fn classify(
    hit: &RuleOnReport,
    content: Option<&RuleContent>,
    policy: &FilterPolicy,
) -> FilterOutcome {
    if policy.skips_disabled(hit) {
        return FilterOutcome::Disabled;
    }
    match content {
        Some(content) if policy.admits(hit, content) => FilterOutcome::Visible,
        _ => FilterOutcome::NoContent,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterResult {
    pub visible: Vec<RuleWithContent>,
    pub no_content: usize,
    pub disabled: usize,
}

impl FilterResult {
    /// Rule count reported to the client.
    ///
    /// Rules that hit but have no content for any of them show up as
    /// "no issues found": the only thing left to show would be the rule
    /// module and error key, which carry no information for customers.
    /// Disabled hits do not count, and their presence keeps the real count.
    pub fn total_count(&self) -> usize {
        if self.visible.is_empty() && self.no_content > 0 && self.disabled == 0 {
            return 0;
        }
        self.visible.len() + self.no_content
    }

    pub fn classified(&self) -> usize {
        self.visible.len() + self.no_content + self.disabled
    }
}

/// Run every hit through the policy, in input order.
///
/// A content lookup failure aborts the whole call: a timeout on one rule
/// must not turn into a quietly shortened report.
pub fn filter_rules(
    hits: &[RuleOnReport],
    lookup: &dyn ContentLookup,
    policy: &FilterPolicy,
) -> Result<FilterResult, ContentError> {
    let mut result = FilterResult::default();

    for hit in hits {
        if policy.skips_disabled(hit) {
            result.disabled += 1;
            continue;
        }

        let content = lookup.content_for(&hit.module, &hit.error_key).map_err(|e| {
            tracing::error!(rule = %hit.module, error_key = %hit.error_key, error = %e, "Content lookup failed");
            e
        })?;

        match classify(hit, content.as_ref(), policy) {
            FilterOutcome::Visible => {
                // classify only returns Visible when content is present
                if let Some(content) = content {
                    result.visible.push(RuleWithContent::join(hit, &content));
                }
            }
            FilterOutcome::NoContent => {
                tracing::debug!(rule = %hit.module, error_key = %hit.error_key, "No visible content for rule");
                result.no_content += 1;
            }
            FilterOutcome::Disabled => result.disabled += 1,
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{test_content, MockContentLookup};

    fn hit(module: &str, key: &str, disabled: bool) -> RuleOnReport {
        RuleOnReport {
            module: module.into(),
            error_key: key.into(),
            user_vote: 0,
            disabled,
            disable_feedback: String::new(),
            disabled_at: String::new(),
            template_data: serde_json::Value::Null,
            created_at: String::new(),
        }
    }

    fn internal(rule_id: &str, key: &str) -> RuleContent {
        RuleContent {
            internal: true,
            ..test_content(rule_id, key)
        }
    }

    fn osd(rule_id: &str, key: &str) -> RuleContent {
        RuleContent {
            osd_customer: true,
            ..test_content(rule_id, key)
        }
    }

    // ── Per-policy tests ─────────────────────────────────────

    #[test]
    fn audience_predicate_admits_only_osd_content() {
        let h = hit("A", "K1", false);
        assert!(AudienceEligible.admits(&h, &osd("A", "K1")));
        assert!(!AudienceEligible.admits(&h, &test_content("A", "K1")));
    }

    #[test]
    fn internal_predicate_depends_on_entitlement() {
        let h = hit("A", "K1", false);
        let content = internal("A", "K1");
        assert!(!InternalAccess { allowed: false }.admits(&h, &content));
        assert!(InternalAccess { allowed: true }.admits(&h, &content));
        assert!(InternalAccess { allowed: false }.admits(&h, &test_content("A", "K1")));
    }

    #[test]
    fn classify_disabled_wins_over_content() {
        let policy = FilterPolicy::new(false);
        let content = test_content("A", "K1");
        assert_eq!(
            classify(&hit("A", "K1", true), Some(&content), &policy),
            FilterOutcome::Disabled
        );
        let policy = FilterPolicy::new(true);
        assert_eq!(
            classify(&hit("A", "K1", true), Some(&content), &policy),
            FilterOutcome::Visible
        );
    }

    #[test]
    fn classify_missing_content_is_no_content() {
        let policy = FilterPolicy::new(false);
        assert_eq!(
            classify(&hit("A", "K1", false), None, &policy),
            FilterOutcome::NoContent
        );
    }

    // ── Scenarios ────────────────────────────────────────────

    #[test]
    fn disabled_hit_counted_and_not_looked_up() {
        let lookup = MockContentLookup::new(vec![test_content("A", "K1"), test_content("A", "K2")]);
        let hits = vec![hit("A", "K1", false), hit("A", "K2", true)];

        let result = filter_rules(&hits, &lookup, &FilterPolicy::for_report(false, false, false)).unwrap();

        assert_eq!(result.visible.len(), 1);
        assert_eq!(result.visible[0].error_key, "K1");
        assert_eq!(result.no_content, 0);
        assert_eq!(result.disabled, 1);
        assert_eq!(result.total_count(), 1);
        assert_eq!(lookup.call_count(), 1);
    }

    #[test]
    fn missing_content_with_disabled_keeps_real_total() {
        let lookup = MockContentLookup::new(vec![test_content("A", "K2")]);
        let hits = vec![hit("A", "K1", false), hit("A", "K2", true)];

        let result = filter_rules(&hits, &lookup, &FilterPolicy::for_report(false, false, false)).unwrap();

        assert!(result.visible.is_empty());
        assert_eq!(result.no_content, 1);
        assert_eq!(result.disabled, 1);
        assert_eq!(result.total_count(), 1);
    }

    #[test]
    fn only_missing_content_forces_total_to_zero() {
        let lookup = MockContentLookup::new(vec![]);
        let hits = vec![hit("A", "K1", false)];

        let result = filter_rules(&hits, &lookup, &FilterPolicy::for_report(false, false, false)).unwrap();

        assert_eq!(result.no_content, 1);
        assert_eq!(result.disabled, 0);
        assert_eq!(result.total_count(), 0);
    }

    #[test]
    fn include_disabled_returns_disabled_hits() {
        let lookup = MockContentLookup::new(vec![test_content("A", "K1"), test_content("A", "K2")]);
        let hits = vec![hit("A", "K1", false), hit("A", "K2", true)];

        let result = filter_rules(&hits, &lookup, &FilterPolicy::for_report(true, false, false)).unwrap();

        assert_eq!(result.visible.len(), 2);
        assert!(result.visible[1].disabled);
        assert_eq!(result.disabled, 0);
    }

    #[test]
    fn audience_filter_counts_ineligible_as_no_content() {
        let lookup = MockContentLookup::new(vec![osd("A", "K1"), test_content("A", "K2")]);
        let hits = vec![hit("A", "K1", false), hit("A", "K2", false)];

        let result = filter_rules(&hits, &lookup, &FilterPolicy::for_report(false, true, false)).unwrap();

        assert_eq!(result.visible.len(), 1);
        assert_eq!(result.visible[0].error_key, "K1");
        assert_eq!(result.no_content, 1);
    }

    #[test]
    fn internal_rule_hidden_from_unentitled_org() {
        let lookup = MockContentLookup::new(vec![internal("A", "K1"), test_content("A", "K2")]);
        let hits = vec![hit("A", "K1", false), hit("A", "K2", false)];

        let hidden = filter_rules(&hits, &lookup, &FilterPolicy::for_report(true, false, false)).unwrap();
        assert!(hidden.visible.iter().all(|r| !r.internal));
        assert_eq!(hidden.no_content, 1);

        let shown = filter_rules(&hits, &lookup, &FilterPolicy::for_report(true, false, true)).unwrap();
        assert_eq!(shown.visible.len(), 2);
    }

    #[test]
    fn timeout_aborts_without_partial_result() {
        let lookup = MockContentLookup::new(vec![test_content("A", "K1"), test_content("A", "K3")])
            .with_timeout_on("K2");
        let hits = vec![hit("A", "K1", false), hit("A", "K2", false), hit("A", "K3", false)];

        let result = filter_rules(&hits, &lookup, &FilterPolicy::for_report(false, false, false));

        assert_eq!(result, Err(ContentError::Timeout));
        // Nothing after the failing hit is looked up.
        assert_eq!(lookup.call_count(), 2);
    }

    #[test]
    fn empty_input_yields_empty_result() {
        let lookup = MockContentLookup::new(vec![]);
        let result = filter_rules(&[], &lookup, &FilterPolicy::new(false)).unwrap();
        assert_eq!(result, FilterResult::default());
        assert_eq!(result.total_count(), 0);
    }

    // ── Invariants over every small combination ──────────────

    #[test]
    fn counts_always_sum_to_input_length() {
        // Per hit: disabled?, has content?, osd?, internal?
        let variants: Vec<(bool, bool, bool, bool)> = (0..16)
            .map(|bits| (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0))
            .collect();

        for first in &variants {
            for second in &variants {
                let mut contents = Vec::new();
                let mut hits = Vec::new();
                for (i, &(disabled, has_content, is_osd, is_internal)) in
                    [first, second].into_iter().enumerate()
                {
                    let key = format!("K{i}");
                    hits.push(hit("A", &key, disabled));
                    if has_content {
                        contents.push(RuleContent {
                            osd_customer: is_osd,
                            internal: is_internal,
                            ..test_content("A", &key)
                        });
                    }
                }
                let lookup = MockContentLookup::new(contents);

                for flags in 0..8 {
                    let include_disabled = flags & 1 != 0;
                    let osd_only = flags & 2 != 0;
                    let internal_allowed = flags & 4 != 0;
                    let policy = FilterPolicy::for_report(include_disabled, osd_only, internal_allowed);
                    let result = filter_rules(&hits, &lookup, &policy).unwrap();

                    assert_eq!(result.classified(), hits.len());
                    if !include_disabled {
                        assert!(result.visible.iter().all(|r| !r.disabled));
                    }
                    if !internal_allowed {
                        assert!(result.visible.iter().all(|r| !r.internal));
                    }
                    if result.visible.is_empty() && result.no_content > 0 {
                        let expected = if result.disabled == 0 { 0 } else { result.no_content };
                        assert_eq!(result.total_count(), expected);
                    }
                }
            }
        }
    }
}
