//! Object-storage mode: module files and npm tarballs.
//!
//! Buckets are public-read; requests carry no credentials and only the
//! validators the bucket understands.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderName, Method, Request};
use url::Url;

use crate::http::request::RequestContext;
use crate::proxy::cache::CacheKey;
use crate::proxy::forward::{authority, backend_uri};
use crate::proxy::{CacheStatus, ProxyClient, ProxyError, ProxyOutcome};
use crate::routing::PathRewrite;

const FORWARDED: [HeaderName; 3] = [header::IF_NONE_MATCH, header::IF_MODIFIED_SINCE, header::RANGE];

/// Bucket implementation details never shown to clients.
const STORAGE_HEADER_PREFIXES: [&str; 2] = ["x-goog-", "x-guploader-"];

impl ProxyClient {
    /// Fetch `{endpoint}/{bucket}/{key}` where the key is the request path.
    pub async fn proxy_to_object_storage(
        &self,
        ctx: &RequestContext,
        request: Request<Body>,
        endpoint: &Url,
        bucket: &str,
        rewrite: PathRewrite,
    ) -> Result<ProxyOutcome, ProxyError> {
        let path = rewrite.apply(&ctx.path);
        let uri = backend_uri(endpoint, &format!("/{bucket}/{}", object_key(&path)), None)?;

        let method = if request.method() == Method::HEAD {
            Method::HEAD
        } else {
            Method::GET
        };
        let mut headers = HeaderMap::new();
        for name in FORWARDED {
            if let Some(value) = request.headers().get(&name) {
                headers.insert(name, value.clone());
            }
        }
        let ranged = headers.contains_key(header::RANGE);

        let cache = self.cache.as_ref().filter(|_| !ranged);
        let cache_key = CacheKey::new(&method, &uri);
        if let Some(hit) = cache.and_then(|c| c.get(&cache_key)) {
            tracing::debug!(uri = %uri, "Edge cache hit");
            return Ok(ProxyOutcome {
                response: hit.to_response(ctx.if_none_match.as_deref()),
                cache: CacheStatus::Hit,
                elapsed: Duration::ZERO,
            });
        }

        let mut outbound = Request::builder().method(method).uri(uri);
        if let Some(map) = outbound.headers_mut() {
            *map = headers;
            map.insert(header::HOST, authority(endpoint).parse()?);
        }
        let (mut response, elapsed) = self.send(outbound.body(Body::empty())?).await?;
        strip_storage_headers(response.headers_mut());

        let (response, status) = match cache {
            Some(cache) => cache.store_response(cache_key, response).await?,
            None => (response, CacheStatus::Bypass),
        };
        Ok(ProxyOutcome {
            response,
            cache: status,
            elapsed,
        })
    }
}

/// Object name for a request path: one leading slash dropped, the rest verbatim.
fn object_key(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

fn strip_storage_headers(headers: &mut HeaderMap) {
    let internal: Vec<HeaderName> = headers
        .keys()
        .filter(|name| {
            STORAGE_HEADER_PREFIXES
                .iter()
                .any(|prefix| name.as_str().starts_with(prefix))
        })
        .cloned()
        .collect();
    for name in internal {
        headers.remove(name);
    }
}
