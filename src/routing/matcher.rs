//! Hostname and path classification.
//!
//! # Responsibilities
//! - Match the request hostname against the root, API and npm hostnames
//! - Recognize API-shaped paths served from the root hostname
//! - Recognize package-scope paths (`/@scope/...`)
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110)
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching

use crate::config::HostsConfig;
use crate::http::request::{normalize_host, RequestContext};

/// Path prefix of package-scope URLs on the root hostname.
pub const SCOPE_PREFIX: &str = "/@";

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, ctx: &RequestContext) -> bool;
}

/// Matches the request hostname.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized the same way request hosts are.
    pub fn new(host: impl AsRef<str>) -> Self {
        Self {
            expected_host: normalize_host(host.as_ref()),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, ctx: &RequestContext) -> bool {
        ctx.host == self.expected_host
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, ctx: &RequestContext) -> bool {
        ctx.path.starts_with(&self.prefix)
    }
}

/// Matches one of a fixed set of exact paths.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    paths: Vec<String>,
}

impl ExactPathMatcher {
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, ctx: &RequestContext) -> bool {
        self.paths.iter().any(|p| *p == ctx.path)
    }
}

/// Which public hostname a request arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    Root,
    Api,
    Npm,
}

/// The compiled hostname and path tables.
#[derive(Debug, Clone)]
pub struct HostTable {
    root: HostMatcher,
    api: HostMatcher,
    npm: HostMatcher,
    root_api_paths: ExactPathMatcher,
    scope_paths: PathPrefixMatcher,
}

impl HostTable {
    pub fn from_config(config: &HostsConfig) -> Self {
        Self {
            root: HostMatcher::new(&config.root),
            api: HostMatcher::new(&config.api),
            npm: HostMatcher::new(&config.npm),
            root_api_paths: ExactPathMatcher::new(config.root_api_paths.iter().cloned()),
            scope_paths: PathPrefixMatcher::new(SCOPE_PREFIX),
        }
    }

    /// Classify the request hostname; `None` for unknown hosts.
    pub fn classify(&self, ctx: &RequestContext) -> Option<HostKind> {
        if self.api.matches(ctx) {
            Some(HostKind::Api)
        } else if self.npm.matches(ctx) {
            Some(HostKind::Npm)
        } else if self.root.matches(ctx) {
            Some(HostKind::Root)
        } else {
            None
        }
    }

    /// Paths on the root hostname answered by the API service.
    pub fn is_root_api_path(&self, ctx: &RequestContext) -> bool {
        self.root_api_paths.matches(ctx)
    }

    /// Paths under a package scope (`/@scope/...`).
    pub fn is_scope_path(&self, ctx: &RequestContext) -> bool {
        self.scope_paths.matches(ctx)
    }
}
