//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (default region has upstreams)
//! - Validate URLs, hostnames and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RoutingConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use url::Url;

use crate::config::schema::RoutingConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("hostname `{0}` is empty")]
    EmptyHost(&'static str),

    #[error("hostnames must be distinct (`{0}` is used twice)")]
    DuplicateHost(String),

    #[error("root API path `{0}` must start with `/`")]
    RootApiPath(String),

    #[error("default region `{0}` has no upstreams")]
    MissingDefaultRegion(String),

    #[error("{field} `{value}` is not an absolute http(s) URL")]
    Url { field: String, value: String },

    #[error("bucket name for {0} is empty")]
    EmptyBucket(&'static str),

    #[error("cache.max_entries must be greater than zero")]
    CacheCapacity,

    #[error("analytics.queue_capacity must be greater than zero")]
    QueueCapacity,

    #[error("session.cookie_name is empty")]
    EmptyCookieName,
}

/// Validate a parsed configuration.
pub fn validate_config(config: &RoutingConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let hosts = [
        ("hosts.root", &config.hosts.root),
        ("hosts.api", &config.hosts.api),
        ("hosts.npm", &config.hosts.npm),
    ];
    for (i, (name, host)) in hosts.iter().enumerate() {
        if host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost(*name));
            continue;
        }
        if hosts[..i]
            .iter()
            .any(|(_, other)| other.eq_ignore_ascii_case(host))
        {
            errors.push(ValidationError::DuplicateHost(host.to_string()));
        }
    }

    for path in &config.hosts.root_api_paths {
        if !path.starts_with('/') {
            errors.push(ValidationError::RootApiPath(path.clone()));
        }
    }

    if !config
        .upstreams
        .regions
        .contains_key(&config.upstreams.default_region)
    {
        errors.push(ValidationError::MissingDefaultRegion(
            config.upstreams.default_region.clone(),
        ));
    }

    // Sorted so error order is stable across runs.
    let mut regions: Vec<_> = config.upstreams.regions.iter().collect();
    regions.sort_by(|a, b| a.0.cmp(b.0));
    for (region, upstream) in regions {
        check_url(
            &mut errors,
            format!("upstreams.regions.{region}.frontend_url"),
            &upstream.frontend_url,
        );
        check_url(
            &mut errors,
            format!("upstreams.regions.{region}.api_url"),
            &upstream.api_url,
        );
    }

    check_url(
        &mut errors,
        "storage.endpoint".to_string(),
        &config.storage.endpoint,
    );
    if config.storage.modules_bucket.trim().is_empty() {
        errors.push(ValidationError::EmptyBucket("modules"));
    }
    if config.storage.npm_bucket.trim().is_empty() {
        errors.push(ValidationError::EmptyBucket("npm"));
    }

    if config.cache.enabled && config.cache.max_entries == 0 {
        errors.push(ValidationError::CacheCapacity);
    }

    if let Some(url) = &config.analytics.url {
        check_url(&mut errors, "analytics.url".to_string(), url);
        if config.analytics.queue_capacity == 0 {
            errors.push(ValidationError::QueueCapacity);
        }
    }

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: String, value: &str) {
    let ok = Url::parse(value)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false);
    if !ok {
        errors.push(ValidationError::Url {
            field,
            value: value.to_string(),
        });
    }
}
