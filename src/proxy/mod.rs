//! Outbound proxy subsystem.
//!
//! # Data Flow
//! ```text
//! RouteDecision (class, rewrite)
//!     → app.rs (frontend / api base URL, forwarding headers, session-aware caching)
//!     → storage.rs (bucket object URL, conditional + ranged reads)
//!     → forward.rs (hop-by-hop stripping, X-Forwarded-*, URI building)
//!     → cache.rs (lookup / populate the shared edge cache)
//!     → redirect.rs (cookie-bearing 3xx → 200 HTML page)
//!     → ProxyOutcome back to the router
//! ```
//!
//! # Design Decisions
//! - One pooled hyper client for every backend, speaking http or https per endpoint
//! - Single attempt per request: network errors surface as 502, never retried
//! - No client-side timeouts; a dropped inbound connection cancels the fetch
//! - Response bodies stream unless they are being stored in the cache

pub mod app;
pub mod cache;
pub mod error;
pub mod forward;
pub mod redirect;
pub mod storage;

use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response, Version};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::{CacheConfig, SessionConfig};

pub use cache::{CacheKey, EdgeCache, SessionPolicy};
pub use error::ProxyError;

/// How the edge cache took part in a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
    Bypass,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Bypass => "BYPASS",
        }
    }
}

/// A backend response plus what the router needs to annotate it.
#[derive(Debug)]
pub struct ProxyOutcome {
    pub response: Response<Body>,
    pub cache: CacheStatus,
    /// Time spent waiting on the backend; zero for cache hits.
    pub elapsed: Duration,
}

/// Pooled outbound client shared by both proxy modes.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client<HttpsConnector<HttpConnector>, Body>,
    cache: Option<EdgeCache>,
    session: SessionPolicy,
}

impl ProxyClient {
    pub fn new(cache: &CacheConfig, session: &SessionConfig) -> Self {
        let connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self {
            client,
            cache: cache.enabled.then(|| EdgeCache::new(cache)),
            session: SessionPolicy::from_config(session),
        }
    }

    /// Issue one request and return the streamed response with its latency.
    async fn send(&self, mut request: Request<Body>) -> Result<(Response<Body>, Duration), ProxyError> {
        *request.version_mut() = Version::HTTP_11;
        let start = Instant::now();
        let response = self.client.request(request).await?;
        let elapsed = start.elapsed();

        let (mut parts, body) = response.into_parts();
        forward::strip_hop_by_hop(&mut parts.headers);
        Ok((Response::from_parts(parts, Body::new(body)), elapsed))
    }
}

/// Mark a response as unshareable by downstream caches.
pub(crate) fn mark_private(response: &mut Response<Body>) {
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-store"));
}
