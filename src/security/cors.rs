//! CORS policy.
//!
//! API, module files and the npm view are public, credential-less resources:
//! every origin may read them. The frontend is same-origin only and gets no
//! CORS headers at all.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Response, StatusCode};

use crate::config::{CorsConfig, CorsRule};
use crate::http::request::RequestContext;
use crate::routing::BackendClass;

/// Pre-rendered header values for one backend class.
#[derive(Debug, Clone)]
struct CorsEntry {
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsEntry {
    fn from_rule(rule: &CorsRule) -> Self {
        Self {
            allow_methods: join_value(&rule.allow_methods),
            allow_headers: join_value(&rule.allow_headers),
        }
    }
}

fn join_value(items: &[String]) -> HeaderValue {
    HeaderValue::from_str(&items.join(", ")).unwrap_or_else(|_| {
        tracing::warn!(value = ?items, "Invalid CORS allow-list in config, ignoring");
        HeaderValue::from_static("")
    })
}

/// Static per-class CORS tables.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    api: CorsEntry,
    modules: CorsEntry,
    npm: CorsEntry,
    max_age: HeaderValue,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Self {
        Self {
            api: CorsEntry::from_rule(&config.api),
            modules: CorsEntry::from_rule(&config.modules),
            npm: CorsEntry::from_rule(&config.npm),
            max_age: HeaderValue::from(config.max_age_secs),
        }
    }

    fn entry(&self, class: BackendClass) -> Option<&CorsEntry> {
        match class {
            BackendClass::Api => Some(&self.api),
            BackendClass::Modules => Some(&self.modules),
            BackendClass::Npm => Some(&self.npm),
            BackendClass::Frontend => None,
        }
    }

    /// Whether `class` answers cross-origin requests.
    pub fn allows_cors(&self, class: BackendClass) -> bool {
        self.entry(class).is_some()
    }

    /// `204` answer to a preflight, without contacting any backend.
    pub fn build_preflight_response(&self, class: BackendClass) -> Response<Body> {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;

        if let Some(entry) = self.entry(class) {
            let headers = response.headers_mut();
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                entry.allow_methods.clone(),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                entry.allow_headers.clone(),
            );
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        }
        response
    }

    /// Headers for actual (non-preflight) responses.
    pub fn apply_cors_headers(&self, headers: &mut HeaderMap, class: BackendClass) {
        if !self.allows_cors(class) {
            return;
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        headers.insert(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("*"),
        );
        append_vary(headers, "Origin");
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self::from_config(&CorsConfig::default())
    }
}

/// `OPTIONS` carrying both `Origin` and `Access-Control-Request-Method`.
pub fn is_preflight(ctx: &RequestContext) -> bool {
    ctx.method == Method::OPTIONS
        && ctx.origin.is_some()
        && ctx.access_control_request_method.is_some()
}

/// Add `token` to `Vary`, keeping whatever is already there.
pub fn append_vary(headers: &mut HeaderMap, token: &str) {
    let existing: Vec<String> = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();

    let present = existing
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|t| t == "*" || t.eq_ignore_ascii_case(token));
    if present {
        return;
    }

    let merged = if existing.is_empty() {
        token.to_string()
    } else {
        format!("{}, {}", existing.join(", "), token)
    };
    match HeaderValue::from_str(&merged) {
        Ok(value) => {
            headers.insert(header::VARY, value);
        }
        Err(_) => {
            if let Ok(value) = HeaderValue::from_str(token) {
                headers.append(header::VARY, value);
            }
        }
    }
}
