//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{RegionUpstreamConfig, RoutingConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Invalid URL for {field}: {source}")]
    Url {
        field: String,
        #[source]
        source: url::ParseError,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (when given), then environment overrides, then validation.
pub fn load_config(path: Option<&Path>) -> Result<RoutingConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => RoutingConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply the deployment environment on top of a parsed config.
///
/// `lookup` abstracts `std::env::var` so tests can supply their own environment.
pub fn apply_env_overrides<F>(config: &mut RoutingConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("BIND_ADDRESS") {
        config.listener.bind_address = v;
    }
    if let Some(v) = get("ROOT_DOMAIN") {
        config.hosts.root = v;
    }
    if let Some(v) = get("API_DOMAIN") {
        config.hosts.api = v;
    }
    if let Some(v) = get("NPM_DOMAIN") {
        config.hosts.npm = v;
    }
    if let Some(v) = get("GCS_ENDPOINT") {
        config.storage.endpoint = v;
    }
    if let Some(v) = get("MODULES_BUCKET") {
        config.storage.modules_bucket = v;
    }
    if let Some(v) = get("NPM_BUCKET") {
        config.storage.npm_bucket = v;
    }
    if let Some(v) = get("ANALYTICS_URL") {
        config.analytics.url = Some(v);
    }
    if let Some(v) = get("LOG_LEVEL") {
        config.observability.log_level = v;
    }

    // Single-region deployments only set these two; they target the default region.
    let frontend = get("REGISTRY_FRONTEND_URL");
    let api = get("REGISTRY_API_URL");
    if frontend.is_some() || api.is_some() {
        let region = config.upstreams.default_region.clone();
        let entry = config
            .upstreams
            .regions
            .entry(region)
            .or_insert_with(|| RegionUpstreamConfig {
                frontend_url: String::new(),
                api_url: String::new(),
            });
        if let Some(v) = frontend {
            entry.frontend_url = v;
        }
        if let Some(v) = api {
            entry.api_url = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_hosts_and_buckets() {
        let mut config = RoutingConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("ROOT_DOMAIN", "jsr.test"),
                ("API_DOMAIN", "api.jsr.test"),
                ("NPM_DOMAIN", "npm.jsr.test"),
                ("MODULES_BUCKET", "jsr-modules"),
                ("NPM_BUCKET", ""),
            ]),
        );

        assert_eq!(config.hosts.root, "jsr.test");
        assert_eq!(config.hosts.api, "api.jsr.test");
        assert_eq!(config.hosts.npm, "npm.jsr.test");
        assert_eq!(config.storage.modules_bucket, "jsr-modules");
        // Empty values are ignored
        assert_eq!(config.storage.npm_bucket, "npm");
    }

    #[test]
    fn test_env_backend_urls_target_default_region() {
        let mut config = RoutingConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[("REGISTRY_API_URL", "http://api.internal:9000")]),
        );

        let us = &config.upstreams.regions["us"];
        assert_eq!(us.api_url, "http://api.internal:9000");
        assert_eq!(us.frontend_url, "http://127.0.0.1:8000");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: RoutingConfig = toml::from_str(
            r#"
            [hosts]
            root = "registry.example"

            [cache]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.hosts.root, "registry.example");
        assert_eq!(config.hosts.api, "api.jsr.io");
        assert!(!config.cache.enabled);
        assert_eq!(config.session.cookie_name, "token");
    }
}
