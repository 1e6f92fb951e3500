//! Generic proxy to a backend service.
//!
//! A proxy route is bound to one backend when the router is built. Each
//! request runs through the route's request modifiers, is forwarded to the
//! backend under the same relative path and query, and the backend answer
//! runs through the response modifiers before being returned as-is.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use reqwest::Url;

use crate::api::error::ApiError;
use crate::api::types::Identity;
use crate::services::{body_error, transport_error, Backend};

/// Largest request body the proxy buffers.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Headers that describe the connection, not the message.
fn hop_headers() -> [header::HeaderName; 4] {
    [
        header::HOST,
        header::CONTENT_LENGTH,
        header::CONNECTION,
        header::TRANSFER_ENCODING,
    ]
}

pub type RequestModifier =
    Arc<dyn Fn(ProxyRequest) -> Result<ProxyRequest, ApiError> + Send + Sync>;
pub type ResponseModifier =
    Arc<dyn Fn(ProxyResponse) -> Result<ProxyResponse, ApiError> + Send + Sync>;

/// Where a proxy route forwards to.
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    pub backend: Backend,
    pub base_url: Url,
}

#[derive(Clone, Default)]
pub struct ProxyOptions {
    pub request_modifiers: Vec<RequestModifier>,
    pub response_modifiers: Vec<ResponseModifier>,
}

impl ProxyOptions {
    pub fn modify_request(mut self, modifier: RequestModifier) -> Self {
        self.request_modifiers.push(modifier);
        self
    }

    pub fn modify_response(mut self, modifier: ResponseModifier) -> Self {
        self.response_modifiers.push(modifier);
        self
    }
}

/// Everything needed to serve one proxy route. Installed as a route
/// extension and read by [`forward`].
#[derive(Clone)]
pub struct ProxyRoute {
    pub target: ProxyTarget,
    pub options: ProxyOptions,
    client: reqwest::Client,
}

impl ProxyRoute {
    pub fn new(client: reqwest::Client, target: ProxyTarget, options: ProxyOptions) -> Self {
        Self {
            target,
            options,
            client,
        }
    }
}

/// Inbound request as seen by request modifiers.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    /// Path relative to the API prefix, percent-encoded, leading `/`.
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub identity: Option<Identity>,
}

/// Backend response as seen by response modifiers.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Handler shared by every proxy route.
pub async fn forward(
    Extension(route): Extension<ProxyRoute>,
    identity: Option<Extension<Identity>>,
    req: Request<Body>,
) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("cannot read request body: {e}")))?;

    let request = ProxyRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body,
        identity: identity.map(|Extension(i)| i),
    };

    let response = dispatch(&route, request).await?;
    Ok(into_http_response(response))
}

/// Run the modifier chains around a single backend call.
pub async fn dispatch(
    route: &ProxyRoute,
    mut request: ProxyRequest,
) -> Result<ProxyResponse, ApiError> {
    for modifier in &route.options.request_modifiers {
        request = modifier(request)?;
    }

    let url = target_url(&route.target.base_url, &request.path, request.query.as_deref())?;
    let backend = route.target.backend;
    tracing::debug!(%url, %backend, method = %request.method, "Proxying request");

    let mut headers = request.headers;
    for name in hop_headers() {
        headers.remove(name);
    }

    let upstream = route
        .client
        .request(request.method, url.clone())
        .headers(headers)
        .body(request.body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(%url, %backend, error = %e, "Proxy request failed");
            transport_error(e, backend)
        })?;

    let status = upstream.status();
    let headers = upstream.headers().clone();
    let body = upstream
        .bytes()
        .await
        .map_err(|e| body_error(e, backend))?;

    let mut response = ProxyResponse {
        status,
        headers,
        body,
    };
    for modifier in &route.options.response_modifiers {
        response = modifier(response)?;
    }
    Ok(response)
}

fn target_url(base: &Url, path: &str, query: Option<&str>) -> Result<Url, ApiError> {
    // "./" keeps a first segment containing ':' from being read as a scheme.
    let relative = format!("./{}", path.trim_start_matches('/'));
    let mut url = base
        .join(&relative)
        .map_err(|e| ApiError::Internal(format!("cannot build proxy URL for {path}: {e}")))?;
    url.set_query(query);
    Ok(url)
}

fn into_http_response(proxied: ProxyResponse) -> Response {
    let mut response = (proxied.status, proxied.body).into_response();
    let hop = hop_headers();
    let headers = response.headers_mut();
    for name in proxied.headers.keys().filter(|name| !hop.contains(*name)) {
        headers.remove(name);
    }
    for (name, value) in proxied.headers.iter() {
        if !hop.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}

// ═══════════════════════════════════════════════════════════
// Modifiers
// ═══════════════════════════════════════════════════════════

/// Insert `users/{user_id}` before the last path segment, turning
/// `.../error_key/{key}/disable` into `.../error_key/{key}/users/{user}/disable`.
pub fn insert_user_id() -> RequestModifier {
    Arc::new(|mut request: ProxyRequest| {
        let identity = request.identity.as_ref().ok_or(ApiError::Unauthorized)?;
        let user_id = &identity.user_id;
        if !user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ApiError::BadRequest(format!("invalid user id {user_id:?}")));
        }

        let trimmed = request.path.trim_end_matches('/');
        let (head, action) = trimmed
            .rsplit_once('/')
            .filter(|(_, action)| !action.is_empty())
            .ok_or_else(|| ApiError::BadRequest(format!("cannot rewrite path {}", request.path)))?;

        request.path = format!("{head}/users/{user_id}/{action}");
        Ok(request)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregator::tests::{dead_url, impatient_client, serve, stalled_url};
    use axum::extract::{OriginalUri, Path};
    use axum::response::AppendHeaders;
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use tower::ServiceExt;

    fn identity() -> Identity {
        Identity {
            org_id: "42".into(),
            account_number: "1234".into(),
            user_id: "1234".into(),
        }
    }

    fn request(path: &str) -> ProxyRequest {
        ProxyRequest {
            method: Method::GET,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            identity: Some(identity()),
        }
    }

    /// Backend echoing what it received.
    async fn echo_backend() -> Url {
        let app = Router::new().fallback(
            |OriginalUri(uri): OriginalUri, headers: HeaderMap, method: Method, body: String| async move {
                Json(serde_json::json!({
                    "method": method.as_str(),
                    "path": uri.path(),
                    "query": uri.query(),
                    "x_custom": headers.get("x-custom").and_then(|v| v.to_str().ok()),
                    "host": headers.get("host").and_then(|v| v.to_str().ok()),
                    "body": body,
                }))
            },
        );
        serve(app).await
    }

    fn route(base: Url, backend: Backend, options: ProxyOptions) -> ProxyRoute {
        ProxyRoute::new(
            reqwest::Client::new(),
            ProxyTarget {
                backend,
                base_url: base,
            },
            options,
        )
    }

    fn json(response: &ProxyResponse) -> serde_json::Value {
        serde_json::from_slice(&response.body).unwrap()
    }

    #[tokio::test]
    async fn forwards_path_query_headers_and_body() {
        let route = route(echo_backend().await, Backend::Content, ProxyOptions::default());
        let mut req = request("/content");
        req.method = Method::POST;
        req.query = Some("lang=en".into());
        req.headers.insert("x-custom", "yes".parse().unwrap());
        req.headers.insert(header::HOST, "gateway.example".parse().unwrap());
        req.body = Bytes::from_static(b"payload");

        let response = dispatch(&route, req).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        let echoed = json(&response);
        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["path"], "/api/v1/content");
        assert_eq!(echoed["query"], "lang=en");
        assert_eq!(echoed["x_custom"], "yes");
        assert_ne!(echoed["host"], "gateway.example");
        assert_eq!(echoed["body"], "payload");
    }

    #[tokio::test]
    async fn request_modifiers_run_in_order() {
        let first: RequestModifier = Arc::new(|mut r: ProxyRequest| {
            r.path.push_str("/a");
            Ok(r)
        });
        let second: RequestModifier = Arc::new(|mut r: ProxyRequest| {
            r.path.push_str("/b");
            Ok(r)
        });
        let options = ProxyOptions::default()
            .modify_request(first)
            .modify_request(second);
        let route = route(echo_backend().await, Backend::Aggregator, options);

        let response = dispatch(&route, request("/start")).await.unwrap();
        assert_eq!(json(&response)["path"], "/api/v1/start/a/b");
    }

    #[tokio::test]
    async fn failing_request_modifier_stops_the_chain() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let reject: RequestModifier =
            Arc::new(|_| Err(ApiError::BadRequest("rejected".into())));
        let count: RequestModifier = Arc::new(move |r| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(r)
        });
        let options = ProxyOptions::default()
            .modify_request(reject)
            .modify_request(count);
        // Nothing listens here; the chain must fail before any connect.
        let route = route(dead_url().await, Backend::Aggregator, options);

        let result = dispatch(&route, request("/content")).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn response_modifiers_transform_backend_answer() {
        let tag: ResponseModifier = Arc::new(|mut r: ProxyResponse| {
            r.status = StatusCode::ACCEPTED;
            r.body = Bytes::from_static(b"{\"rewritten\":true}");
            Ok(r)
        });
        let route = route(
            echo_backend().await,
            Backend::Content,
            ProxyOptions::default().modify_response(tag),
        );

        let response = dispatch(&route, request("/content")).await.unwrap();
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(json(&response)["rewritten"], true);
    }

    #[tokio::test]
    async fn transport_failure_names_the_bound_backend() {
        let content = route(dead_url().await, Backend::Content, ProxyOptions::default());
        assert!(matches!(
            dispatch(&content, request("/content")).await,
            Err(ApiError::ServiceUnavailable(Backend::Content))
        ));

        let aggregator = route(dead_url().await, Backend::Aggregator, ProxyOptions::default());
        assert!(matches!(
            dispatch(&aggregator, request("/content")).await,
            Err(ApiError::ServiceUnavailable(Backend::Aggregator))
        ));
    }

    #[tokio::test]
    async fn backend_error_status_and_body_pass_through() {
        let app = Router::new().route(
            "/api/v1/content",
            get(|| async { (StatusCode::NOT_FOUND, "{\"status\":\"missing\"}") }),
        );
        let route = route(serve(app).await, Backend::Content, ProxyOptions::default());

        let response = dispatch(&route, request("/content")).await.unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(&response.body[..], b"{\"status\":\"missing\"}");
    }

    #[test]
    fn user_id_is_inserted_before_action() {
        let modifier = insert_user_id();
        let rewritten = modifier(request(
            "/clusters/c-1/rules/rule.a/error_key/K1/disable",
        ))
        .unwrap();
        assert_eq!(
            rewritten.path,
            "/clusters/c-1/rules/rule.a/error_key/K1/users/1234/disable"
        );
    }

    #[test]
    fn user_id_rewrite_requires_identity() {
        let mut req = request("/clusters/c-1/rules/rule.a/error_key/K1/like");
        req.identity = None;
        assert!(matches!(insert_user_id()(req), Err(ApiError::Unauthorized)));
    }

    #[test]
    fn user_id_with_path_characters_is_rejected() {
        let mut req = request("/clusters/c-1/rules/rule.a/error_key/K1/like");
        req.identity = Some(Identity {
            user_id: "../admin".into(),
            ..identity()
        });
        assert!(matches!(insert_user_id()(req), Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn handler_uses_path_relative_to_nest_prefix() {
        let backend = Router::new().route(
            "/api/v1/clusters/:cluster/rules/:rule/error_key/:key/users/:user/:action",
            put(
                |Path((cluster, _rule, _key, user, action)): Path<(String, String, String, String, String)>| async move {
                    Json(serde_json::json!({"cluster": cluster, "user": user, "action": action}))
                },
            ),
        );
        let proxy = route(
            serve(backend).await,
            Backend::Aggregator,
            ProxyOptions::default().modify_request(insert_user_id()),
        );
        let app = Router::new().nest(
            "/api/v1",
            Router::new()
                .route(
                    "/clusters/:cluster/rules/:rule/error_key/:key/disable",
                    put(forward).layer(Extension(proxy)),
                )
                .layer(Extension(identity())),
        );

        let req = Request::builder()
            .method("PUT")
            .uri("/api/v1/clusters/c-1/rules/rule.a/error_key/K1/disable")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), 4096).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"], "1234");
        assert_eq!(json["action"], "disable");
    }

    #[tokio::test]
    async fn stalled_body_names_the_bound_backend() {
        let route = ProxyRoute::new(
            impatient_client(),
            ProxyTarget {
                backend: Backend::Content,
                base_url: stalled_url().await,
            },
            ProxyOptions::default(),
        );

        let result = dispatch(&route, request("/content")).await;
        assert!(matches!(
            result,
            Err(ApiError::ServiceUnavailable(Backend::Content))
        ));
    }

    #[tokio::test]
    async fn repeated_response_headers_are_all_forwarded() {
        let backend = Router::new().route(
            "/api/v1/content",
            get(|| async {
                (
                    AppendHeaders([(header::SET_COOKIE, "a=1"), (header::SET_COOKIE, "b=2")]),
                    Json(serde_json::json!({"status": "ok"})),
                )
            }),
        );
        let proxy = route(serve(backend).await, Backend::Content, ProxyOptions::default());
        let app = Router::new().nest(
            "/api/v1",
            Router::new().route("/content", get(forward).layer(Extension(proxy))),
        );

        let req = Request::builder()
            .uri("/api/v1/content")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<_> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies, vec!["a=1", "b=2"]);
        assert_eq!(response.headers().get_all(header::CONTENT_TYPE).iter().count(), 1);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }
}
