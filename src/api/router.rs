//! Gateway router.
//!
//! Returns a composable `Router` with every route nested under the
//! configured API prefix.
//!
//! Middleware stack (outermost → innermost):
//! 1. CORS (when enabled) → 2. Request logger → 3. Identity (protected routes)

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::proxy::{self, ProxyOptions, ProxyRoute, ProxyTarget};
use crate::api::types::{ApiContext, IDENTITY_HEADER};
use crate::config::ServerConfig;
use crate::services::Backend;

/// Rule actions forwarded to the aggregator with the caller's user id.
const RULE_ACTIONS: &[&str] = &["disable", "enable", "like", "dislike", "reset_vote"];

/// Build the gateway router.
///
/// Middleware uses request extensions (`Identity`, `ProxyRoute`).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7), and a
/// segment shared by several routes must use the same param name.
pub fn gateway_router(ctx: ApiContext, server: &ServerConfig) -> Router {
    let content_proxy = ProxyRoute::new(
        ctx.http.clone(),
        ProxyTarget {
            backend: Backend::Content,
            base_url: ctx.content_base_url.clone(),
        },
        ProxyOptions::default(),
    );
    let rule_action_proxy = ProxyRoute::new(
        ctx.http.clone(),
        ProxyTarget {
            backend: Backend::Aggregator,
            base_url: ctx.aggregator.base_url().clone(),
        },
        ProxyOptions::default().modify_request(proxy::insert_user_id()),
    );

    let mut protected = Router::new()
        .route("/report/:cluster", get(endpoints::reports::report))
        .route("/report/:cluster/info", get(endpoints::reports::report_info))
        .route("/report/:cluster/rule/:rule", get(endpoints::rules::rule))
        .route("/clusters", get(endpoints::clusters::list))
        .route("/clusters/reports", post(endpoints::reports::reports_for_payload))
        .route(
            "/clusters/:cluster/reports",
            get(endpoints::reports::reports_for_list),
        )
        .route("/org_overview", get(endpoints::overview::org_overview))
        .route("/groups", get(endpoints::groups::list))
        .route(
            "/content",
            get(proxy::forward).layer(Extension(content_proxy)),
        );

    for action in RULE_ACTIONS {
        protected = protected.route(
            &format!("/clusters/:cluster/rules/:rule_id/error_key/:error_key/{action}"),
            put(proxy::forward).layer(Extension(rule_action_proxy.clone())),
        );
    }

    let protected = protected
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::identity::require_identity));

    // Unprotected routes
    let public = Router::new()
        .route("/", get(endpoints::health::check))
        .with_state(ctx);

    let app = Router::new()
        .nest(server.route_prefix(), protected.merge(public))
        .layer(axum::middleware::from_fn(middleware::request_log::log_request));

    if server.enable_cors {
        app.layer(cors_layer())
    } else {
        app
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::HeaderName::from_static(IDENTITY_HEADER),
        ])
}
