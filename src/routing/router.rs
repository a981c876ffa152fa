//! Edge router: request → backend class → proxied, annotated response.
//!
//! # Responsibilities
//! - Decide the backend class from hostname, path and headers
//! - Answer CORS preflights at the edge
//! - Dispatch to the app backend or object-storage proxy
//! - Apply security, CORS and diagnostic headers
//! - Report downloads and request metrics
//!
//! # Design Decisions
//! - `decide` is pure: same context and config, same decision
//! - All tables are built once from `RoutingConfig` and injected
//! - Backend failures become plain-text 502s, never retried

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::response::IntoResponse;
use url::Url;

use crate::analytics::{DownloadSink, DownloadTracker, RegistryKind};
use crate::backends::{RegionSelector, UpstreamPool};
use crate::config::{ConfigError, RoutingConfig};
use crate::http::request::{ContextSettings, RequestContext};
use crate::http::response::{apply_diagnostics, plain_text, Diagnostics};
use crate::observability::metrics;
use crate::proxy::{CacheStatus, ProxyClient, ProxyError, ProxyOutcome};
use crate::routing::matcher::{HostKind, HostTable};
use crate::routing::{BackendClass, PathRewrite};
use crate::security::{can_access_module_file, is_preflight, BotClassifier, CorsPolicy, SecurityHeaders};

/// Where a request goes and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub class: BackendClass,
    pub rewrite: PathRewrite,
    /// The request came from a known crawler.
    pub bot: bool,
    /// Answer at the edge with a CORS preflight response.
    pub preflight: bool,
}

/// Failure surfaced to the client.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("unknown host `{0}`")]
    UnknownHost(String),

    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> axum::response::Response {
        match self {
            RouteError::UnknownHost(_) => plain_text(StatusCode::NOT_FOUND, "Not Found"),
            RouteError::Proxy(e) if e.status() == StatusCode::BAD_GATEWAY => {
                plain_text(StatusCode::BAD_GATEWAY, "Bad Gateway")
            }
            RouteError::Proxy(e) => plain_text(e.status(), "Internal Server Error"),
        }
    }
}

/// The edge router with all of its immutable tables.
#[derive(Debug)]
pub struct EdgeRouter {
    config: Arc<RoutingConfig>,
    hosts: HostTable,
    bots: BotClassifier,
    regions: RegionSelector,
    upstreams: UpstreamPool,
    storage_endpoint: Url,
    proxy: ProxyClient,
    security: SecurityHeaders,
    cors: CorsPolicy,
    tracker: DownloadTracker,
    settings: ContextSettings,
}

impl EdgeRouter {
    pub fn new(config: Arc<RoutingConfig>, sink: Arc<dyn DownloadSink>) -> Result<Self, ConfigError> {
        let storage_endpoint = Url::parse(&config.storage.endpoint).map_err(|source| ConfigError::Url {
            field: "storage.endpoint".to_string(),
            source,
        })?;

        Ok(Self {
            hosts: HostTable::from_config(&config.hosts),
            bots: BotClassifier::from_config(&config.bots),
            regions: RegionSelector::new(&config.regions, config.upstreams.default_region.clone()),
            upstreams: UpstreamPool::from_config(&config.upstreams)?,
            storage_endpoint,
            proxy: ProxyClient::new(&config.cache, &config.session),
            security: SecurityHeaders::from_config(&config.security),
            cors: CorsPolicy::from_config(&config.cors),
            tracker: DownloadTracker::new(sink),
            settings: ContextSettings::from_config(&config.upstreams, config.listener.tls.is_some()),
            config,
        })
    }

    /// Pick the backend class; `None` for unknown hostnames.
    pub fn decide(&self, ctx: &RequestContext) -> Option<RouteDecision> {
        let preflight = is_preflight(ctx);
        let decision = |class, rewrite, bot| RouteDecision {
            class,
            rewrite,
            bot,
            preflight: preflight && self.cors.allows_cors(class),
        };

        match self.hosts.classify(ctx)? {
            HostKind::Api => Some(decision(BackendClass::Api, PathRewrite::ApiPrefix, false)),
            HostKind::Npm => Some(decision(BackendClass::Npm, PathRewrite::Identity, false)),
            HostKind::Root => {
                if self.hosts.is_root_api_path(ctx) {
                    return Some(decision(BackendClass::Api, PathRewrite::Identity, false));
                }
                if self.bots.is_bot(ctx) {
                    return Some(decision(BackendClass::Frontend, PathRewrite::Identity, true));
                }
                if self.hosts.is_scope_path(ctx)
                    && (can_access_module_file(ctx) || (preflight && preflights_module_read(ctx)))
                {
                    return Some(decision(BackendClass::Modules, PathRewrite::Identity, false));
                }
                Some(decision(BackendClass::Frontend, PathRewrite::Identity, false))
            }
        }
    }

    /// Serve one request end to end.
    pub async fn route(&self, request: Request<Body>, peer: SocketAddr) -> Response<Body> {
        let start = Instant::now();
        let ctx = RequestContext::from_request(&request, peer, &self.settings);
        let request_id = ctx.request_id.as_deref().unwrap_or("-");

        let Some(decision) = self.decide(&ctx) else {
            tracing::debug!(request_id = %request_id, host = %ctx.host, "Unknown host");
            metrics::record_request("none", StatusCode::NOT_FOUND.as_u16(), start);
            return RouteError::UnknownHost(ctx.host.clone()).into_response();
        };
        let class = decision.class;

        let pop_region = self.regions.select_region(ctx.pop.as_deref());
        let (region, backends) = self.upstreams.for_region(pop_region);

        let result = if decision.preflight {
            Ok(ProxyOutcome {
                response: self.cors.build_preflight_response(class),
                cache: CacheStatus::Bypass,
                elapsed: Duration::ZERO,
            })
        } else {
            match class {
                BackendClass::Api => {
                    self.proxy
                        .proxy_to_backend(&ctx, request, &backends.api, decision.rewrite)
                        .await
                }
                BackendClass::Frontend => {
                    self.proxy
                        .proxy_to_backend(&ctx, request, &backends.frontend, decision.rewrite)
                        .await
                }
                BackendClass::Modules => {
                    self.proxy
                        .proxy_to_object_storage(
                            &ctx,
                            request,
                            &self.storage_endpoint,
                            &self.config.storage.modules_bucket,
                            decision.rewrite,
                        )
                        .await
                }
                BackendClass::Npm => {
                    self.proxy
                        .proxy_to_object_storage(
                            &ctx,
                            request,
                            &self.storage_endpoint,
                            &self.config.storage.npm_bucket,
                            decision.rewrite,
                        )
                        .await
                }
            }
        };

        let (mut response, cache, upstream) = match result {
            Ok(outcome) => (outcome.response, outcome.cache, outcome.elapsed),
            Err(e) => {
                metrics::record_upstream_error(class.as_str());
                if e.status() == StatusCode::BAD_GATEWAY {
                    tracing::warn!(request_id = %request_id, backend = %class, error = %e, "Backend unreachable");
                } else {
                    tracing::error!(request_id = %request_id, backend = %class, error = %e, "Proxy failure");
                }
                (RouteError::from(e).into_response(), CacheStatus::Bypass, Duration::ZERO)
            }
        };

        let headers = response.headers_mut();
        self.security.apply_security_headers(headers, class);
        self.cors.apply_cors_headers(headers, class);
        apply_diagnostics(
            headers,
            &Diagnostics {
                backend: class,
                cache,
                bot: decision.bot,
                region,
                upstream,
            },
        );

        let status = response.status();
        if status.is_success() && ctx.is_read() && !decision.preflight {
            match class {
                BackendClass::Modules => self.tracker.track_download(&ctx.path, RegistryKind::Jsr),
                BackendClass::Npm => self.tracker.track_download(&ctx.path, RegistryKind::Npm),
                BackendClass::Api | BackendClass::Frontend => {}
            }
        }

        metrics::record_request(class.as_str(), status.as_u16(), start);
        tracing::debug!(
            request_id = %request_id,
            host = %ctx.host,
            path = %ctx.path,
            backend = %class,
            region = %region,
            status = status.as_u16(),
            cache = cache.as_str(),
            "Request routed"
        );
        response
    }
}

/// A preflight announcing a plain read, which the module gate would allow.
fn preflights_module_read(ctx: &RequestContext) -> bool {
    matches!(
        ctx.access_control_request_method.as_deref(),
        Some(m) if m == Method::GET.as_str() || m == Method::HEAD.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::NoopSink;

    fn router() -> EdgeRouter {
        EdgeRouter::new(Arc::new(RoutingConfig::default()), Arc::new(NoopSink)).unwrap()
    }

    fn ctx(method: Method, host: &str, path: &str, headers: &[(&str, &str)]) -> RequestContext {
        let mut builder = Request::builder().method(method).uri(path).header("Host", host);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let req = builder.body(()).unwrap();
        RequestContext::from_request(&req, "127.0.0.1:1".parse().unwrap(), &ContextSettings::default())
    }

    fn class(router: &EdgeRouter, ctx: &RequestContext) -> BackendClass {
        router.decide(ctx).unwrap().class
    }

    #[test]
    fn test_hostname_dispatch() {
        let router = router();

        let api = router.decide(&ctx(Method::GET, "api.jsr.io", "/scopes", &[])).unwrap();
        assert_eq!(api.class, BackendClass::Api);
        assert_eq!(api.rewrite, PathRewrite::ApiPrefix);

        assert_eq!(
            class(&router, &ctx(Method::GET, "npm.jsr.io", "/@jsr/std__fs", &[])),
            BackendClass::Npm
        );
        assert_eq!(class(&router, &ctx(Method::GET, "JSR.io:443", "/", &[])), BackendClass::Frontend);
        assert!(router.decide(&ctx(Method::GET, "example.com", "/", &[])).is_none());
    }

    #[test]
    fn test_root_api_paths_not_rewritten() {
        let router = router();
        for path in ["/sitemap.xml", "/login", "/login/callback", "/logout"] {
            let decision = router.decide(&ctx(Method::GET, "jsr.io", path, &[])).unwrap();
            assert_eq!(decision.class, BackendClass::Api, "{path}");
            assert_eq!(decision.rewrite, PathRewrite::Identity);
        }
    }

    #[test]
    fn test_module_gate() {
        let router = router();
        let path = "/@std/fs/1.0.0/mod.ts";

        assert_eq!(class(&router, &ctx(Method::GET, "jsr.io", path, &[])), BackendClass::Modules);
        assert_eq!(
            class(&router, &ctx(Method::GET, "jsr.io", path, &[("Accept", "text/html,*/*")])),
            BackendClass::Frontend
        );
        assert_eq!(class(&router, &ctx(Method::POST, "jsr.io", path, &[])), BackendClass::Frontend);
        assert_eq!(
            class(
                &router,
                &ctx(
                    Method::GET,
                    "jsr.io",
                    path,
                    &[("Sec-Fetch-Dest", "image"), ("Sec-Fetch-Site", "cross-site")]
                )
            ),
            BackendClass::Frontend
        );
        assert_eq!(
            class(
                &router,
                &ctx(
                    Method::GET,
                    "jsr.io",
                    path,
                    &[("Sec-Fetch-Dest", "image"), ("Sec-Fetch-Site", "same-origin")]
                )
            ),
            BackendClass::Modules
        );
    }

    #[test]
    fn test_precedence() {
        let router = router();
        let bot = [("User-Agent", "Mozilla/5.0 (compatible; Googlebot/2.1)")];

        let decision = router
            .decide(&ctx(Method::GET, "jsr.io", "/@std/fs/1.0.0/mod.ts", &bot))
            .unwrap();
        assert_eq!(decision.class, BackendClass::Frontend);
        assert!(decision.bot);

        // API-shaped paths win over bot detection.
        assert_eq!(class(&router, &ctx(Method::GET, "jsr.io", "/sitemap.xml", &bot)), BackendClass::Api);
    }

    #[test]
    fn test_preflight_decisions() {
        let router = router();
        let preflight = [("Origin", "https://example.com"), ("Access-Control-Request-Method", "GET")];

        let api = router.decide(&ctx(Method::OPTIONS, "api.jsr.io", "/scopes", &preflight)).unwrap();
        assert!(api.preflight);

        let module = router
            .decide(&ctx(Method::OPTIONS, "jsr.io", "/@std/fs/meta.json", &preflight))
            .unwrap();
        assert_eq!(module.class, BackendClass::Modules);
        assert!(module.preflight);

        let frontend = router.decide(&ctx(Method::OPTIONS, "jsr.io", "/docs", &preflight)).unwrap();
        assert_eq!(frontend.class, BackendClass::Frontend);
        assert!(!frontend.preflight);

        let plain = router.decide(&ctx(Method::OPTIONS, "api.jsr.io", "/scopes", &[])).unwrap();
        assert!(!plain.preflight);
    }

    #[tokio::test]
    async fn test_unknown_host_is_404() {
        let router = router();
        let request = Request::builder()
            .uri("/")
            .header("Host", "unknown.example")
            .body(Body::empty())
            .unwrap();

        let response = router.route(request, "127.0.0.1:1".parse().unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preflight_answered_at_edge() {
        let router = router();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/scopes")
            .header("Host", "api.jsr.io")
            .header("Origin", "https://example.com")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();

        let response = router.route(request, "127.0.0.1:1".parse().unwrap()).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "GET, HEAD, POST, PUT, PATCH, DELETE, OPTIONS"
        );
        assert_eq!(response.headers()["x-edge-backend"], "api");
    }
}
