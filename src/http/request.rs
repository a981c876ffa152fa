//! Request handling and classification input.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Extract routing-relevant information (host, path, fetch metadata)
//! - Resolve client IP and point of presence from edge headers
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The context is a plain snapshot; routing decisions never look at the raw request
//! - Original request preserved for forwarding; the context is only read

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::UpstreamsConfig;

/// Request ID header name.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates a UUID v4 request ID for every inbound request.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeRequestId;

impl MakeRequestId for EdgeRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Where per-request edge metadata is read from.
#[derive(Debug, Clone)]
pub struct ContextSettings {
    /// Header carrying the point of presence (e.g., `cf-ray`).
    pub pop_header: Option<HeaderName>,
    /// Header carrying the client IP as observed by the edge.
    pub client_ip_header: Option<HeaderName>,
    /// Scheme assumed when no `X-Forwarded-Proto` is present.
    pub default_scheme: &'static str,
}

impl ContextSettings {
    pub fn from_config(config: &UpstreamsConfig, tls: bool) -> Self {
        Self {
            pop_header: parse_header_name(&config.pop_header),
            client_ip_header: parse_header_name(&config.client_ip_header),
            default_scheme: if tls { "https" } else { "http" },
        }
    }
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self::from_config(&UpstreamsConfig::default(), false)
    }
}

fn parse_header_name(name: &str) -> Option<HeaderName> {
    if name.trim().is_empty() {
        return None;
    }
    match HeaderName::from_bytes(name.trim().to_ascii_lowercase().as_bytes()) {
        Ok(name) => Some(name),
        Err(_) => {
            tracing::warn!(header = %name, "Ignoring invalid header name in config");
            None
        }
    }
}

/// Everything the routing policy needs to know about one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Lowercased hostname without port.
    pub host: String,
    /// Host as sent by the client, forwarded as `X-Forwarded-Host`.
    pub original_host: Option<String>,
    pub scheme: String,
    pub path: String,
    pub query: Option<String>,
    pub accept: Option<String>,
    pub sec_fetch_dest: Option<String>,
    pub sec_fetch_site: Option<String>,
    pub origin: Option<String>,
    pub access_control_request_method: Option<String>,
    pub has_authorization: bool,
    pub cookie: Option<String>,
    pub user_agent: Option<String>,
    pub from: Option<String>,
    pub if_none_match: Option<String>,
    /// Upper-case point-of-presence code.
    pub pop: Option<String>,
    pub client_ip: IpAddr,
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Snapshot the routing-relevant parts of a request.
    pub fn from_request<B>(request: &Request<B>, peer: SocketAddr, settings: &ContextSettings) -> Self {
        let headers = request.headers();
        let uri = request.uri();

        let original_host = header_str(headers, header::HOST)
            .or_else(|| uri.authority().map(|a| a.to_string()));
        let host = original_host
            .as_deref()
            .map(normalize_host)
            .unwrap_or_default();

        let scheme = header_str(headers, "x-forwarded-proto")
            .and_then(|v| v.split(',').next().map(|s| s.trim().to_ascii_lowercase()))
            .filter(|s| s == "http" || s == "https")
            .or_else(|| uri.scheme_str().map(str::to_string))
            .unwrap_or_else(|| settings.default_scheme.to_string());

        let client_ip = settings
            .client_ip_header
            .as_ref()
            .and_then(|name| header_str(headers, name.clone()))
            .and_then(|v| v.split(',').next().and_then(|s| s.trim().parse().ok()))
            .unwrap_or_else(|| peer.ip());

        let pop = settings
            .pop_header
            .as_ref()
            .and_then(|name| header_str(headers, name.clone()))
            .and_then(|v| parse_pop(&v));

        Self {
            method: request.method().clone(),
            host,
            original_host,
            scheme,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            accept: header_str(headers, header::ACCEPT),
            sec_fetch_dest: header_str(headers, "sec-fetch-dest"),
            sec_fetch_site: header_str(headers, "sec-fetch-site"),
            origin: header_str(headers, header::ORIGIN),
            access_control_request_method: header_str(
                headers,
                header::ACCESS_CONTROL_REQUEST_METHOD,
            ),
            has_authorization: headers.contains_key(header::AUTHORIZATION),
            cookie: joined_cookies(headers),
            user_agent: header_str(headers, header::USER_AGENT),
            from: header_str(headers, header::FROM),
            if_none_match: header_str(headers, header::IF_NONE_MATCH),
            pop,
            client_ip,
            request_id: header_str(headers, X_REQUEST_ID),
        }
    }

    /// GET or HEAD.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Whether the `Cookie` header carries a cookie with the given name.
    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookie.as_deref().is_some_and(|cookies| {
            cookies
                .split(';')
                .filter_map(|pair| pair.split_once('='))
                .any(|(key, _)| key.trim() == name)
        })
    }
}

fn header_str<K: header::AsHeaderName>(headers: &HeaderMap, name: K) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// All `Cookie` fields folded into one value; HTTP/2 clients may split them.
fn joined_cookies(headers: &HeaderMap) -> Option<String> {
    let fields: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if fields.is_empty() {
        None
    } else {
        Some(fields.join("; "))
    }
}

/// Lowercase, drop the port and any trailing dot.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if let Some(rest) = host.strip_prefix('[') {
        // IPv6 literal
        rest.split(']').next().unwrap_or(rest)
    } else {
        host.rsplit_once(':')
            .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
            .map(|(h, _)| h)
            .unwrap_or(host)
    };
    without_port.trim_end_matches('.').to_ascii_lowercase()
}

/// Point-of-presence code from a header value.
///
/// Accepts a bare code (`FRA`) or a ray-style id whose suffix is the code
/// (`8a1b2c3d4e5f6a7b-FRA`).
fn parse_pop(value: &str) -> Option<String> {
    let code = value.rsplit('-').next().unwrap_or(value).trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_ascii_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "10.1.2.3:5555".parse().unwrap()
    }

    #[test]
    fn test_context_from_request() {
        let req = Request::builder()
            .method("GET")
            .uri("/@std/fs/1.0.0/mod.ts?x=1")
            .header("Host", "JSR.io:443")
            .header("Accept", "*/*")
            .header("Sec-Fetch-Dest", "empty")
            .header("cf-ray", "8a1b2c3d4e5f6a7b-fra")
            .header("cf-connecting-ip", "203.0.113.9")
            .header("Cookie", "theme=dark; token=abc")
            .body(())
            .unwrap();

        let ctx = RequestContext::from_request(&req, peer(), &ContextSettings::default());
        assert_eq!(ctx.host, "jsr.io");
        assert_eq!(ctx.original_host.as_deref(), Some("JSR.io:443"));
        assert_eq!(ctx.path, "/@std/fs/1.0.0/mod.ts");
        assert_eq!(ctx.query.as_deref(), Some("x=1"));
        assert_eq!(ctx.pop.as_deref(), Some("FRA"));
        assert_eq!(ctx.client_ip.to_string(), "203.0.113.9");
        assert_eq!(ctx.scheme, "http");
        assert!(ctx.has_cookie("token"));
        assert!(!ctx.has_cookie("session"));
        assert!(ctx.is_read());
    }

    #[test]
    fn test_split_cookie_fields() {
        let req = Request::builder()
            .uri("/account")
            .header("Host", "jsr.io")
            .header("Cookie", "theme=dark")
            .header("Cookie", "token=secret")
            .body(())
            .unwrap();

        let ctx = RequestContext::from_request(&req, peer(), &ContextSettings::default());
        assert_eq!(ctx.cookie.as_deref(), Some("theme=dark; token=secret"));
        assert!(ctx.has_cookie("token"));
        assert!(ctx.has_cookie("theme"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let req = Request::builder()
            .uri("/")
            .header("Host", "jsr.io")
            .header("cf-connecting-ip", "garbage")
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();

        let ctx = RequestContext::from_request(&req, peer(), &ContextSettings::default());
        assert_eq!(ctx.client_ip.to_string(), "10.1.2.3");
        assert_eq!(ctx.scheme, "https");
        assert_eq!(ctx.pop, None);
    }

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("API.jsr.io"), "api.jsr.io");
        assert_eq!(normalize_host("jsr.io:8080"), "jsr.io");
        assert_eq!(normalize_host("jsr.io."), "jsr.io");
        assert_eq!(normalize_host("[::1]:8080"), "::1");
    }
}
