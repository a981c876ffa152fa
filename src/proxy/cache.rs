//! Shared edge cache.
//!
//! Entries are immutable point-in-time snapshots behind an `Arc`; a write
//! replaces the whole entry, so concurrent readers never see a partial one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode, Uri};
use bytes::Bytes;
use dashmap::DashMap;
use http_body_util::{BodyExt, Limited};

use crate::config::{CacheConfig, SessionConfig};
use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::proxy::{CacheStatus, ProxyError};

/// Canonical request identity: method + fully resolved backend URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(method: &Method, uri: &Uri) -> Self {
        Self(format!("{} {}", method, uri))
    }
}

/// A stored response.
#[derive(Debug)]
pub struct CachedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes, ttl: Duration) -> Self {
        Self {
            status,
            headers,
            body,
            stored_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }

    /// Materialize the snapshot, answering `304` when the client's validator matches.
    pub fn to_response(&self, if_none_match: Option<&str>) -> Response<Body> {
        let age = HeaderValue::from(self.stored_at.elapsed().as_secs());

        let etag = self.headers.get(header::ETAG).and_then(|v| v.to_str().ok());
        if let (Some(candidates), Some(etag)) = (if_none_match, etag) {
            if etag_matches(candidates, etag) {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::NOT_MODIFIED;
                let headers = response.headers_mut();
                for name in [header::ETAG, header::CACHE_CONTROL, header::LAST_MODIFIED, header::VARY] {
                    if let Some(value) = self.headers.get(&name) {
                        headers.insert(name, value.clone());
                    }
                }
                headers.insert(header::AGE, age);
                return response;
            }
        }

        let mut response = Response::new(Body::from(self.body.clone()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        response.headers_mut().insert(header::AGE, age);
        response
    }
}

fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let weak = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let etag = weak(etag);
    if_none_match
        .split(',')
        .any(|candidate| candidate.trim() == "*" || weak(candidate) == etag)
}

/// How long a response may be cached, or `None` when it must not be.
pub fn freshness(headers: &HeaderMap, default_ttl: Duration) -> Option<Duration> {
    let directives: Vec<String> = headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|d| d.trim().to_ascii_lowercase())
        .collect();

    if directives
        .iter()
        .any(|d| d == "no-store" || d == "private" || d == "no-cache")
    {
        return None;
    }

    let seconds = |prefix: &str| {
        directives
            .iter()
            .find_map(|d| d.strip_prefix(prefix).and_then(|v| v.trim().parse::<u64>().ok()))
    };
    match seconds("s-maxage=").or_else(|| seconds("max-age=")) {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => Some(default_ttl),
    }
}

/// Whether the response depends on request headers the cache key ignores.
///
/// `Origin` is tolerated: CORS headers are applied at the edge after lookup.
fn varies(headers: &HeaderMap) -> bool {
    for value in headers.get_all(header::VARY) {
        let Ok(value) = value.to_str() else {
            return true;
        };
        let other = value
            .split(',')
            .map(str::trim)
            .any(|name| !name.is_empty() && !name.eq_ignore_ascii_case("origin"));
        if other {
            return true;
        }
    }
    false
}

/// In-process edge cache shared by all requests.
#[derive(Debug, Clone)]
pub struct EdgeCache {
    entries: Arc<DashMap<CacheKey, Arc<CachedResponse>>>,
    max_entries: usize,
    default_ttl: Duration,
    max_body_bytes: usize,
}

impl EdgeCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: config.max_entries,
            default_ttl: Duration::from_secs(config.default_ttl_secs),
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Fresh entry for `key`, evicting it if stale.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CachedResponse>> {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        if entry.is_fresh() {
            metrics::record_cache("hit");
            Some(entry)
        } else {
            self.entries.remove_if(key, |_, v| !v.is_fresh());
            None
        }
    }

    /// TTL for a backend response, `None` when it is not storable.
    pub fn storable_ttl(&self, status: StatusCode, headers: &HeaderMap) -> Option<Duration> {
        if status != StatusCode::OK || headers.contains_key(header::SET_COOKIE) || varies(headers) {
            return None;
        }
        // Bodies are buffered before they are stored; unknown lengths stream through.
        let length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())?;
        if length > self.max_body_bytes {
            return None;
        }
        freshness(headers, self.default_ttl)
    }

    pub fn insert(&self, key: CacheKey, response: CachedResponse) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.entries.retain(|_, v| v.is_fresh());
            if self.entries.len() >= self.max_entries {
                tracing::debug!(entries = self.entries.len(), "Edge cache full, not storing");
                return;
            }
        }
        self.entries.insert(key, Arc::new(response));
        metrics::record_cache("store");
    }

    /// Store `response` when it is cacheable and hand back an equivalent response.
    pub async fn store_response(
        &self,
        key: CacheKey,
        response: Response<Body>,
    ) -> Result<(Response<Body>, CacheStatus), ProxyError> {
        metrics::record_cache("miss");
        let Some(ttl) = self.storable_ttl(response.status(), response.headers()) else {
            return Ok((response, CacheStatus::Miss));
        };

        let (parts, body) = response.into_parts();
        let bytes = Limited::new(body, self.max_body_bytes)
            .collect()
            .await
            .map_err(ProxyError::Body)?
            .to_bytes();

        self.insert(
            key,
            CachedResponse::new(parts.status, parts.headers.clone(), bytes.clone(), ttl),
        );
        Ok((Response::from_parts(parts, Body::from(bytes)), CacheStatus::Miss))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which app-backend requests may share cached responses.
#[derive(Debug, Clone)]
pub struct SessionPolicy {
    cookie_name: String,
    uncacheable_paths: Vec<String>,
}

impl SessionPolicy {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            cookie_name: config.cookie_name.clone(),
            uncacheable_paths: config.uncacheable_paths.clone(),
        }
    }

    /// No credentials, no session cookie, not a login/logout path.
    pub fn is_cache_eligible(&self, ctx: &RequestContext) -> bool {
        !ctx.has_authorization
            && !ctx.has_cookie(&self.cookie_name)
            && !self.uncacheable_paths.iter().any(|p| *p == ctx.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ContextSettings;
    use axum::http::Request;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_freshness() {
        let default = Duration::from_secs(60);

        assert_eq!(freshness(&headers(&[]), default), Some(default));
        assert_eq!(
            freshness(&headers(&[("cache-control", "public, max-age=300")]), default),
            Some(Duration::from_secs(300))
        );
        assert_eq!(
            freshness(&headers(&[("cache-control", "max-age=300, s-maxage=30")]), default),
            Some(Duration::from_secs(30))
        );
        assert_eq!(freshness(&headers(&[("cache-control", "max-age=0")]), default), None);
        assert_eq!(freshness(&headers(&[("cache-control", "private")]), default), None);
        assert_eq!(freshness(&headers(&[("cache-control", "No-Store")]), default), None);
    }

    #[test]
    fn test_storable_ttl() {
        let cache = EdgeCache::new(&CacheConfig::default());

        assert!(cache
            .storable_ttl(StatusCode::OK, &headers(&[("content-length", "10")]))
            .is_some());
        // Unknown length
        assert!(cache.storable_ttl(StatusCode::OK, &headers(&[])).is_none());
        assert!(cache
            .storable_ttl(StatusCode::NOT_FOUND, &headers(&[("content-length", "10")]))
            .is_none());
        assert!(cache
            .storable_ttl(
                StatusCode::OK,
                &headers(&[("content-length", "10"), ("set-cookie", "a=b")])
            )
            .is_none());
        assert!(cache
            .storable_ttl(StatusCode::OK, &headers(&[("content-length", "999999999")]))
            .is_none());
    }

    #[test]
    fn test_vary_limits_storage() {
        let cache = EdgeCache::new(&CacheConfig::default());
        let storable = |vary: &'static str| {
            cache
                .storable_ttl(StatusCode::OK, &headers(&[("content-length", "10"), ("vary", vary)]))
                .is_some()
        };

        assert!(storable("Origin"));
        assert!(storable("origin, Origin"));
        assert!(!storable("*"));
        assert!(!storable("Accept-Encoding"));
        assert!(!storable("Origin, Accept"));

        // Split across fields
        let split = headers(&[("content-length", "10"), ("vary", "Origin"), ("vary", "Cookie")]);
        assert!(cache.storable_ttl(StatusCode::OK, &split).is_none());
    }

    #[test]
    fn test_get_evicts_stale_entries() {
        let cache = EdgeCache::new(&CacheConfig::default());
        let key = CacheKey::new(&Method::GET, &Uri::from_static("http://backend/a"));

        cache.insert(
            key.clone(),
            CachedResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"a"), Duration::ZERO),
        );
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_bound() {
        let config = CacheConfig {
            max_entries: 1,
            ..CacheConfig::default()
        };
        let cache = EdgeCache::new(&config);
        let fresh = || {
            CachedResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::new(), Duration::from_secs(60))
        };

        cache.insert(CacheKey::new(&Method::GET, &Uri::from_static("http://b/1")), fresh());
        cache.insert(CacheKey::new(&Method::GET, &Uri::from_static("http://b/2")), fresh());
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&CacheKey::new(&Method::GET, &Uri::from_static("http://b/1")))
            .is_some());
    }

    #[test]
    fn test_conditional_hit() {
        let cached = CachedResponse::new(
            StatusCode::OK,
            headers(&[("etag", "\"abc\""), ("content-type", "text/plain")]),
            Bytes::from_static(b"hello"),
            Duration::from_secs(60),
        );

        let not_modified = cached.to_response(Some("W/\"abc\""));
        assert_eq!(not_modified.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(not_modified.headers()[header::ETAG], "\"abc\"");

        let full = cached.to_response(Some("\"other\""));
        assert_eq!(full.status(), StatusCode::OK);
        assert_eq!(full.headers()[header::CONTENT_TYPE], "text/plain");
        assert!(full.headers().contains_key(header::AGE));
    }

    #[test]
    fn test_session_policy() {
        let policy = SessionPolicy::from_config(&SessionConfig::default());
        let ctx = |path: &str, headers: &[(&str, &str)]| {
            let mut builder = Request::builder().uri(path).header("Host", "jsr.io");
            for (name, value) in headers {
                builder = builder.header(*name, *value);
            }
            let req = builder.body(()).unwrap();
            RequestContext::from_request(&req, "127.0.0.1:1".parse().unwrap(), &ContextSettings::default())
        };

        assert!(policy.is_cache_eligible(&ctx("/@std/fs", &[])));
        assert!(policy.is_cache_eligible(&ctx("/", &[("Cookie", "theme=dark")])));
        assert!(!policy.is_cache_eligible(&ctx("/", &[("Cookie", "token=abc")])));
        assert!(!policy.is_cache_eligible(&ctx("/", &[("Authorization", "Bearer x")])));
        assert!(!policy.is_cache_eligible(&ctx("/logout", &[])));
    }
}
