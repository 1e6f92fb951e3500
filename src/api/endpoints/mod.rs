//! HTTP endpoint handlers, grouped by resource.

pub mod clusters;
pub mod groups;
pub mod health;
pub mod overview;
pub mod reports;
pub mod rules;

use std::collections::HashMap;

use crate::api::error::ApiError;
use crate::models::cluster::validate_cluster_name;

/// Boolean in the forms clients send: `1`/`0`, `t`/`f`, `true`/`false`
/// in lower, upper or title case.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

/// Strict boolean query parameter: absent is `false`, malformed is a 400.
pub(crate) fn bool_param(query: &HashMap<String, String>, name: &str) -> Result<bool, ApiError> {
    match query.get(name) {
        None => Ok(false),
        Some(raw) => parse_bool(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("parameter {name} must be a boolean, got {raw:?}"))
        }),
    }
}

/// Lenient boolean query parameter: malformed values are logged and read as `false`.
pub(crate) fn lenient_bool_param(query: &HashMap<String, String>, name: &str) -> bool {
    match query.get(name) {
        None => false,
        Some(raw) => parse_bool(raw).unwrap_or_else(|| {
            tracing::warn!(parameter = name, value = %raw, "Malformed boolean parameter, using false");
            false
        }),
    }
}

pub(crate) fn cluster_param(raw: &str) -> Result<String, ApiError> {
    validate_cluster_name(raw)
        .map_err(|_| ApiError::BadRequest(format!("invalid cluster name {raw:?}")))
}
