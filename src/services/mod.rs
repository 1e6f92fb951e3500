//! Clients for the backend services the gateway talks to.

pub mod aggregator;
pub mod membership;

pub use aggregator::AggregatorClient;
pub use membership::{HttpMembershipClient, MembershipError, MembershipService};

use reqwest::Url;
use serde::Serialize;

use crate::api::error::ApiError;

/// Backend a request was bound for. Used to name the failing service in
/// `ServiceUnavailable` errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Aggregator,
    Content,
    Membership,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aggregator => write!(f, "Aggregator service"),
            Self::Content => write!(f, "Content service"),
            Self::Membership => write!(f, "Identity service"),
        }
    }
}

/// Build a URL from a base endpoint and a path template.
///
/// Each `{placeholder}` segment of the template consumes the next entry of
/// `params`; parameters are percent-encoded as single path segments.
/// Returns `None` if the base cannot carry a path or the parameter count
/// does not match the template.
pub fn make_url(base: &Url, template: &str, params: &[&str]) -> Option<Url> {
    let mut url = base.clone();
    let mut params = params.iter();
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.pop_if_empty();
        for part in template.split('/').filter(|p| !p.is_empty()) {
            if part.starts_with('{') && part.ends_with('}') {
                segments.push(params.next()?);
            } else {
                segments.push(part);
            }
        }
    }
    if params.next().is_some() {
        return None;
    }
    Some(url)
}

/// Map a failed `send()` to the domain error for `backend`.
///
/// Connect, DNS and timeout failures mean the backend is unavailable; a
/// request that could not even be built is our own bug.
pub(crate) fn transport_error(err: reqwest::Error, backend: Backend) -> ApiError {
    if err.is_builder() {
        ApiError::Internal(err.to_string())
    } else {
        ApiError::ServiceUnavailable(backend)
    }
}

/// Map a failure while reading a response body.
///
/// The client timeout also covers the body, so a backend that stalls or
/// drops the connection mid-response is unavailable like one that never
/// answered.
pub(crate) fn body_error(err: reqwest::Error, backend: Backend) -> ApiError {
    if err.is_timeout() || err.is_body() || err.is_decode() {
        tracing::error!(%backend, error = %err, "Backend response body could not be read");
        ApiError::ServiceUnavailable(backend)
    } else {
        ApiError::Internal(format!("reading {backend} response: {err}"))
    }
}
