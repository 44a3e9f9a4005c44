//! Shared helpers for gateway integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use gembridge_core::testing::ScriptedBackend;
use gembridge_proxy::{ProxyConfig, router};

/// Router backed by `backend` with default settings.
pub fn app(backend: &ScriptedBackend) -> Router {
    app_with(backend, ProxyConfig::default())
}

/// Router backed by `backend` with custom settings.
pub fn app_with(backend: &ScriptedBackend, config: ProxyConfig) -> Router {
    router(Arc::new(backend.clone()), config)
}

/// Send a GET request.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Send a POST with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: &serde_json::Value) -> Response<Body> {
    post_raw(app, uri, body.to_string()).await
}

/// Send a POST with an arbitrary body.
pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Collect a response body as text.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Split an SSE body into its `data:` payloads.
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|event| !event.is_empty())
        .map(|event| {
            event
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("not a data event: {event:?}"))
                .to_string()
        })
        .collect()
}
