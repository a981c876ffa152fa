//! Response helpers shared by the router and the server.
//!
//! # Responsibilities
//! - Plain-text error bodies
//! - Diagnostic `x-edge-*` headers describing how a response was produced

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode};

use crate::proxy::CacheStatus;
use crate::routing::BackendClass;

pub const X_EDGE_BACKEND: HeaderName = HeaderName::from_static("x-edge-backend");
pub const X_EDGE_CACHE: HeaderName = HeaderName::from_static("x-edge-cache");
pub const X_EDGE_BOT: HeaderName = HeaderName::from_static("x-edge-bot");
pub const X_EDGE_REGION: HeaderName = HeaderName::from_static("x-edge-region");
pub const X_EDGE_UPSTREAM_MS: HeaderName = HeaderName::from_static("x-edge-upstream-ms");
pub const X_EDGE_VERSION: HeaderName = HeaderName::from_static("x-edge-version");

/// A `text/plain` response.
pub fn plain_text(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// How a response was produced.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostics<'a> {
    pub backend: BackendClass,
    pub cache: CacheStatus,
    pub bot: bool,
    pub region: &'a str,
    pub upstream: Duration,
}

pub fn apply_diagnostics(headers: &mut HeaderMap, diagnostics: &Diagnostics<'_>) {
    headers.insert(X_EDGE_BACKEND, HeaderValue::from_static(diagnostics.backend.as_str()));
    headers.insert(X_EDGE_CACHE, HeaderValue::from_static(diagnostics.cache.as_str()));
    headers.insert(
        X_EDGE_BOT,
        HeaderValue::from_static(if diagnostics.bot { "1" } else { "0" }),
    );
    if let Ok(region) = HeaderValue::from_str(diagnostics.region) {
        headers.insert(X_EDGE_REGION, region);
    }
    headers.insert(
        X_EDGE_UPSTREAM_MS,
        HeaderValue::from(diagnostics.upstream.as_millis() as u64),
    );
    headers.insert(X_EDGE_VERSION, HeaderValue::from_static(env!("CARGO_PKG_VERSION")));
}
