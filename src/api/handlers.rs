use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::badge;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<Store>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// SVG response with aggressive no-cache headers; GitHub Camo caches badge
/// images unless explicitly told not to. The timestamped ETag and
/// Last-Modified are extra cache busters for proxies that ignore
/// Cache-Control.
fn svg_response(svg: String) -> impl IntoResponse {
    let now = Utc::now();
    (
        [
            (header::CONTENT_TYPE, "image/svg+xml".to_string()),
            (
                header::CACHE_CONTROL,
                "no-cache, no-store, must-revalidate, max-age=0".to_string(),
            ),
            (header::PRAGMA, "no-cache".to_string()),
            (header::EXPIRES, "0".to_string()),
            (header::ETAG, format!("\"{}\"", now.timestamp_millis())),
            (
                header::LAST_MODIFIED,
                now.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
            ),
        ],
        svg,
    )
}

/// Client IP: X-Forwarded-For (first hop) when behind a proxy, then
/// X-Real-IP, then the socket peer address
pub fn client_ip(headers: &HeaderMap, socket_addr: SocketAddr) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    socket_addr.ip().to_string()
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Visitor badge, counting the visit: GET /v1/visit/{namespace}/{key}
pub async fn visit_badge(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ip = client_ip(&headers, addr);
    let stats = state
        .store
        .increment_visit(
            &namespace,
            &key,
            header_str(&headers, header::USER_AGENT),
            header_str(&headers, header::REFERER),
            Some(&ip),
        )
        .await;

    svg_response(badge::visitor_badge(&stats))
}

/// Combined visit+like badge, counting the visit: GET /v1/badge/{namespace}/{key}
pub async fn combined_badge(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ip = client_ip(&headers, addr);
    let stats = state
        .store
        .increment_visit(
            &namespace,
            &key,
            header_str(&headers, header::USER_AGENT),
            header_str(&headers, header::REFERER),
            Some(&ip),
        )
        .await;
    let likes = state.store.get_like_count(&namespace, &key).await;

    svg_response(badge::combined_badge(stats.count, likes))
}

/// Read-only like badge: GET /v1/like/{namespace}/{key}
pub async fn like_badge(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
) -> impl IntoResponse {
    let count = state.store.get_like_count(&namespace, &key).await;
    svg_response(badge::like_badge(count))
}

/// Like action: GET /v1/like/{namespace}/{key}/add
///
/// Responds with a small page that bounces back to the referring page, so
/// the button works from a plain README link.
pub async fn add_like(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let ip = client_ip(&headers, addr);
    let referer = header_str(&headers, header::REFERER).map(str::to_string);
    state
        .store
        .increment_like(
            &namespace,
            &key,
            header_str(&headers, header::USER_AGENT),
            referer.as_deref(),
            Some(&ip),
        )
        .await;

    let back = referer.as_deref().unwrap_or("/health");
    let page = format!(
        concat!(
            "<!DOCTYPE html><html><head>",
            r#"<meta charset="utf-8">"#,
            r#"<meta http-equiv="refresh" content="1;url={url}">"#,
            "<title>Liked!</title></head>",
            "<body><p>\u{2764} Thanks! Redirecting back&hellip;</p>",
            "<p><small>Badges on GitHub may take a few minutes to refresh.</small></p>",
            "</body></html>"
        ),
        url = back.replace('"', "%22"),
    );

    (
        [(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")],
        Html(page),
    )
}

/// Like button SVG: GET /v1/button/{namespace}/{key}
pub async fn like_button(
    State(state): State<Arc<AppState>>,
    Path((namespace, key)): Path<(String, String)>,
) -> impl IntoResponse {
    let count = state.store.get_like_count(&namespace, &key).await;
    svg_response(badge::like_button(count))
}

/// Promo button SVG: GET /v1/promo
pub async fn promo_button() -> impl IntoResponse {
    svg_response(badge::promo_button())
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
