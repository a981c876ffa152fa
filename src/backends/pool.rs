//! App-backend pool.
//!
//! # Responsibilities
//! - Hold the parsed frontend/API base URLs of every region
//! - Resolve a region to its backends, falling back to the default region

use std::collections::HashMap;

use url::Url;

use crate::config::{ConfigError, UpstreamsConfig};

/// Base URLs of the app backends in one region.
#[derive(Debug, Clone)]
pub struct RegionBackends {
    pub frontend: Url,
    pub api: Url,
}

/// Regional app backends.
#[derive(Debug, Clone)]
pub struct UpstreamPool {
    regions: HashMap<String, RegionBackends>,
    default_region: String,
}

impl UpstreamPool {
    /// Parse every configured base URL.
    pub fn from_config(config: &UpstreamsConfig) -> Result<Self, ConfigError> {
        let mut regions = HashMap::new();
        for (name, upstream) in &config.regions {
            let parse = |field: &str, value: &str| {
                Url::parse(value).map_err(|source| ConfigError::Url {
                    field: format!("upstreams.regions.{name}.{field}"),
                    source,
                })
            };
            regions.insert(
                name.clone(),
                RegionBackends {
                    frontend: parse("frontend_url", &upstream.frontend_url)?,
                    api: parse("api_url", &upstream.api_url)?,
                },
            );
        }

        if !regions.contains_key(&config.default_region) {
            return Err(ConfigError::Validation(vec![
                crate::config::validation::ValidationError::MissingDefaultRegion(
                    config.default_region.clone(),
                ),
            ]));
        }

        Ok(Self {
            regions,
            default_region: config.default_region.clone(),
        })
    }

    /// Backends for `region`, or the default region's when it has none.
    ///
    /// Returns the region actually used alongside the backends.
    pub fn for_region<'a>(&'a self, region: &'a str) -> (&'a str, &'a RegionBackends) {
        match self.regions.get(region) {
            Some(backends) => (region, backends),
            None => {
                tracing::debug!(region = %region, "No backends in region, using default");
                (&self.default_region, &self.regions[&self.default_region])
            }
        }
    }
}
