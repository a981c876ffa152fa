//! Header manipulation for forwarded requests.
//!
//! # Responsibilities
//! - Add X-Forwarded-For, X-Forwarded-Proto, X-Forwarded-Host
//! - Strip hop-by-hop headers in both directions
//! - Build backend URIs from base URLs
//!
//! # Design Decisions
//! - Preserve the existing X-Forwarded-For chain; the edge-observed client IP is appended
//! - `Host` always names the backend, the public host travels in X-Forwarded-Host

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Uri};
use url::Url;

use crate::http::request::RequestContext;
use crate::proxy::ProxyError;

const HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Remove connection-scoped headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Point the request at `backend_authority` and record where it came from.
pub fn set_forwarding_headers(
    headers: &mut HeaderMap,
    ctx: &RequestContext,
    backend_authority: &str,
) -> Result<(), ProxyError> {
    headers.insert(header::HOST, HeaderValue::from_str(backend_authority)?);

    let chain: Vec<&str> = headers
        .get_all(&X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    let forwarded_for = if chain.is_empty() {
        ctx.client_ip.to_string()
    } else {
        format!("{}, {}", chain.join(", "), ctx.client_ip)
    };
    headers.insert(X_FORWARDED_FOR, HeaderValue::from_str(&forwarded_for)?);

    headers.insert(X_FORWARDED_PROTO, HeaderValue::from_str(&ctx.scheme)?);
    if let Some(host) = &ctx.original_host {
        headers.insert(X_FORWARDED_HOST, HeaderValue::from_str(host)?);
    }
    Ok(())
}

/// `host[:port]` of a base URL.
pub fn authority(base: &Url) -> String {
    let host = base.host_str().unwrap_or_default();
    match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Join a base URL (which may carry a path prefix) with a request path and query.
pub fn backend_uri(base: &Url, path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
    let mut target = format!(
        "{}://{}{}{}",
        base.scheme(),
        authority(base),
        base.path().trim_end_matches('/'),
        path
    );
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target
        .parse()
        .map_err(|source| ProxyError::InvalidUri { uri: target, source })
}
