//! Shared types for the API layer.

use std::sync::Arc;

use base64::Engine;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::config::InternalRulesAccess;
use crate::content::{ContentLookup, GroupsSnapshot};
use crate::pipeline::ClusterResolver;
use crate::services::AggregatorClient;

/// Header carrying the caller identity, base64-encoded JSON.
pub const IDENTITY_HEADER: &str = "x-rh-identity";

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
#[derive(Clone)]
pub struct ApiContext {
    pub aggregator: AggregatorClient,
    pub resolver: ClusterResolver,
    pub content: Arc<dyn ContentLookup>,
    pub groups: GroupsSnapshot,
    pub internal_rules: Arc<InternalRulesAccess>,
    /// Client used by the proxy routes.
    pub http: reqwest::Client,
    pub content_base_url: Url,
}

impl ApiContext {
    /// Whether the organization may see internal rule content.
    pub fn internal_rules_allowed(&self, org_id: &str) -> bool {
        self.internal_rules.allows(org_id)
    }
}

// ═══════════════════════════════════════════════════════════
// Identity: injected by the identity middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated caller, decoded from the identity header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub org_id: String,
    pub account_number: String,
    pub user_id: String,
}

/// Ids show up both as JSON strings and as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(u64),
}

impl IdValue {
    fn into_string(self) -> String {
        match self {
            IdValue::Text(s) => s,
            IdValue::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct IdentityEnvelope {
    identity: IdentityBody,
}

#[derive(Deserialize)]
struct IdentityBody {
    #[serde(default)]
    account_number: Option<IdValue>,
    #[serde(default)]
    org_id: Option<IdValue>,
    #[serde(default)]
    internal: Option<InternalIdentity>,
    #[serde(default)]
    user: Option<UserIdentity>,
}

#[derive(Deserialize)]
struct InternalIdentity {
    #[serde(default)]
    org_id: Option<IdValue>,
}

#[derive(Deserialize)]
struct UserIdentity {
    #[serde(default)]
    user_id: Option<IdValue>,
}

fn non_empty(value: Option<IdValue>) -> Option<String> {
    value.map(IdValue::into_string).filter(|s| !s.is_empty())
}

impl Identity {
    /// Decode the identity header value.
    ///
    /// The organization comes from `identity.org_id`, or from
    /// `identity.internal.org_id` when the former is absent. The user id
    /// is `identity.user.user_id` when present, otherwise the account
    /// number. Either one missing means the caller is not authenticated.
    pub fn from_header(raw: &str) -> Result<Self, ApiError> {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(raw.trim())
            .map_err(|e| {
                tracing::warn!(error = %e, "Identity header is not valid base64");
                ApiError::Unauthorized
            })?;
        let envelope: IdentityEnvelope = serde_json::from_slice(&decoded).map_err(|e| {
            tracing::warn!(error = %e, "Identity header is not a valid identity document");
            ApiError::Unauthorized
        })?;
        let body = envelope.identity;

        let account_number = non_empty(body.account_number).unwrap_or_default();
        let org_id = non_empty(body.org_id)
            .or_else(|| body.internal.and_then(|i| non_empty(i.org_id)))
            .ok_or(ApiError::Unauthorized)?;
        let user_id = body
            .user
            .and_then(|u| non_empty(u.user_id))
            .or_else(|| Some(account_number.clone()).filter(|s| !s.is_empty()))
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self {
            org_id,
            account_number,
            user_id,
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Response envelopes
// ═══════════════════════════════════════════════════════════

/// `{"status": "ok"}`
#[derive(Debug, Serialize)]
pub struct StatusOnly {
    pub status: &'static str,
}

impl StatusOnly {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}
