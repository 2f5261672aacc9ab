#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Header carrying the session token.
pub const AUTH_HEADER: &str = "X-Authorization";

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();
    let body_str = String::from_utf8(body.to_vec()).unwrap_or_default();

    (status, body_str)
}

/// Send a GET request and return (status, body).
pub async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_default();
    send(app, request).await
}

/// Send an authenticated GET request.
pub async fn get_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .header(AUTH_HEADER, token)
        .body(Body::empty())
        .unwrap_or_default();
    send(app, request).await
}

/// Send a GET request and return (status, content-type, raw bytes).
pub async fn get_binary(app: &Router, uri: &str) -> (StatusCode, String, Vec<u8>) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap_or_default();

    let response = app.clone().oneshot(request).await.unwrap_or_default();

    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response
        .into_body()
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .unwrap_or_default();

    (status, content_type, body.to_vec())
}

/// Send a POST request with a JSON body.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default();
    send(app, request).await
}

/// Send an authenticated POST request with a JSON body.
pub async fn post_json_with_auth(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
    token: &str,
) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(AUTH_HEADER, token)
        .body(Body::from(body.to_string()))
        .unwrap_or_default();
    send(app, request).await
}

/// Send an authenticated POST request with no body.
pub async fn post_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(AUTH_HEADER, token)
        .body(Body::empty())
        .unwrap_or_default();
    send(app, request).await
}

/// Send an authenticated PATCH request with a JSON body.
pub async fn patch_json_with_auth(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
    token: &str,
) -> (StatusCode, String) {
    let request = Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .header(AUTH_HEADER, token)
        .body(Body::from(body.to_string()))
        .unwrap_or_default();
    send(app, request).await
}

/// Send an authenticated DELETE request.
pub async fn delete_with_auth(app: &Router, uri: &str, token: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(AUTH_HEADER, token)
        .body(Body::empty())
        .unwrap_or_default();
    send(app, request).await
}

/// Send an authenticated PUT request with raw bytes and a content type.
pub async fn put_bytes_with_auth(
    app: &Router,
    uri: &str,
    content_type: &str,
    bytes: Vec<u8>,
    token: &str,
) -> (StatusCode, String) {
    let request = Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", content_type)
        .header(AUTH_HEADER, token)
        .body(Body::from(bytes))
        .unwrap_or_default();
    send(app, request).await
}
