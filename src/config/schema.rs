//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge router.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the edge router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RoutingConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Public hostnames the router answers for.
    pub hosts: HostsConfig,

    /// App-backend base URLs per region.
    pub upstreams: UpstreamsConfig,

    /// Point-of-presence to region lookup table.
    pub regions: RegionTableConfig,

    /// Object-storage endpoint and bucket names.
    pub storage: StorageConfig,

    /// Edge cache settings.
    pub cache: CacheConfig,

    /// Session detection used for cache eligibility.
    pub session: SessionConfig,

    /// Known crawler signatures.
    pub bots: BotConfig,

    /// CORS allow-lists per backend class.
    pub cors: CorsConfig,

    /// Security header values for storage-backed classes.
    pub security: SecurityConfig,

    /// Download analytics sink.
    pub analytics: AnalyticsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// The three routable hostnames.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HostsConfig {
    /// Root hostname serving the frontend and module files (e.g., "jsr.io").
    pub root: String,

    /// API hostname (e.g., "api.jsr.io").
    pub api: String,

    /// npm compatibility hostname (e.g., "npm.jsr.io").
    pub npm: String,

    /// Paths on the root hostname that are answered by the API service as-is.
    pub root_api_paths: Vec<String>,
}

impl Default for HostsConfig {
    fn default() -> Self {
        Self {
            root: "jsr.io".to_string(),
            api: "api.jsr.io".to_string(),
            npm: "npm.jsr.io".to_string(),
            root_api_paths: vec![
                "/sitemap.xml".to_string(),
                "/sitemap-scopes.xml".to_string(),
                "/sitemap-packages.xml".to_string(),
                "/login".to_string(),
                "/login/callback".to_string(),
                "/logout".to_string(),
            ],
        }
    }
}

/// App-backend definitions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Region used when the point of presence is unknown.
    pub default_region: String,

    /// Header carrying the point-of-presence identifier.
    pub pop_header: String,

    /// Header carrying the edge-observed client IP.
    pub client_ip_header: String,

    /// Backend base URLs keyed by region name.
    pub regions: HashMap<String, RegionUpstreamConfig>,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        let mut regions = HashMap::new();
        regions.insert(
            "us".to_string(),
            RegionUpstreamConfig {
                frontend_url: "http://127.0.0.1:8000".to_string(),
                api_url: "http://127.0.0.1:8001".to_string(),
            },
        );
        Self {
            default_region: "us".to_string(),
            pop_header: "cf-ray".to_string(),
            client_ip_header: "cf-connecting-ip".to_string(),
            regions,
        }
    }
}

/// Base URLs of the app backends in one region.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionUpstreamConfig {
    /// Rendered frontend base URL.
    pub frontend_url: String,

    /// API service base URL.
    pub api_url: String,
}

/// Edge location code to region mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionTableConfig {
    /// Upper-case PoP code (e.g., "FRA") to region name (e.g., "eu").
    pub pops: HashMap<String, String>,
}

impl Default for RegionTableConfig {
    fn default() -> Self {
        const TABLE: &[(&str, &str)] = &[
            ("ATL", "us"),
            ("DFW", "us"),
            ("EWR", "us"),
            ("IAD", "us"),
            ("LAX", "us"),
            ("MIA", "us"),
            ("ORD", "us"),
            ("SEA", "us"),
            ("SJC", "us"),
            ("YYZ", "us"),
            ("GRU", "us"),
            ("AMS", "eu"),
            ("ARN", "eu"),
            ("CDG", "eu"),
            ("FRA", "eu"),
            ("LHR", "eu"),
            ("MAD", "eu"),
            ("MXP", "eu"),
            ("WAW", "eu"),
            ("ZRH", "eu"),
            ("BOM", "asia"),
            ("HKG", "asia"),
            ("ICN", "asia"),
            ("NRT", "asia"),
            ("SIN", "asia"),
            ("SYD", "asia"),
        ];
        Self {
            pops: TABLE
                .iter()
                .map(|(pop, region)| (pop.to_string(), region.to_string()))
                .collect(),
        }
    }
}

/// Object-storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket endpoint, objects are fetched from `{endpoint}/{bucket}/{key}`.
    pub endpoint: String,

    /// Bucket holding published module files.
    pub modules_bucket: String,

    /// Bucket holding the npm compatibility view.
    pub npm_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4443".to_string(),
            modules_bucket: "modules".to_string(),
            npm_bucket: "npm".to_string(),
        }
    }
}

/// Edge cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the in-process edge cache.
    pub enabled: bool,

    /// Maximum number of cached responses.
    pub max_entries: usize,

    /// TTL used when the backend response carries no max-age.
    pub default_ttl_secs: u64,

    /// Responses larger than this are never cached.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 10_000,
            default_ttl_secs: 60,
            max_body_bytes: 8 * 1024 * 1024, // 8MB
        }
    }
}

/// Session detection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session-token cookie.
    pub cookie_name: String,

    /// Paths whose responses are never cached.
    pub uncacheable_paths: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "token".to_string(),
            uncacheable_paths: vec![
                "/login".to_string(),
                "/login/callback".to_string(),
                "/logout".to_string(),
            ],
        }
    }
}

/// Crawler detection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Case-insensitive substrings of known crawler user agents.
    pub signatures: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        const SIGNATURES: &[&str] = &[
            "googlebot",
            "google-inspectiontool",
            "bingbot",
            "duckduckbot",
            "baiduspider",
            "yandexbot",
            "slurp",
            "applebot",
            "petalbot",
            "facebookexternalhit",
            "twitterbot",
            "linkedinbot",
            "slackbot",
            "discordbot",
            "telegrambot",
            "whatsapp",
            "embedly",
            "gptbot",
            "claudebot",
            "perplexitybot",
        ];
        Self {
            signatures: SIGNATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Value of `Access-Control-Max-Age` on preflight responses.
    pub max_age_secs: u64,

    /// Allow-list for the API service.
    pub api: CorsRule,

    /// Allow-list for module files.
    pub modules: CorsRule,

    /// Allow-list for the npm compatibility view.
    pub npm: CorsRule,
}

impl Default for CorsConfig {
    fn default() -> Self {
        let read_only = CorsRule {
            allow_methods: vec!["GET".to_string(), "HEAD".to_string(), "OPTIONS".to_string()],
            allow_headers: vec![
                "Range".to_string(),
                "If-None-Match".to_string(),
                "If-Modified-Since".to_string(),
            ],
        };
        Self {
            max_age_secs: 86_400,
            api: CorsRule {
                allow_methods: vec![
                    "GET".to_string(),
                    "HEAD".to_string(),
                    "POST".to_string(),
                    "PUT".to_string(),
                    "PATCH".to_string(),
                    "DELETE".to_string(),
                    "OPTIONS".to_string(),
                ],
                allow_headers: vec![
                    "Authorization".to_string(),
                    "Content-Type".to_string(),
                    "X-Cloud-Trace-Context".to_string(),
                ],
            },
            modules: read_only.clone(),
            npm: read_only,
        }
    }
}

/// Methods and headers a backend class accepts cross-origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsRule {
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
}

/// Security header values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Content-Security-Policy sent with module files and npm objects.
    pub storage_csp: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            storage_csp: "default-src 'none'; frame-ancestors 'none'; form-action 'none'; sandbox"
                .to_string(),
        }
    }
}

/// Download analytics configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Collector URL download events are POSTed to. Metrics only when unset.
    pub url: Option<String>,

    /// Events buffered before new ones are dropped.
    pub queue_capacity: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            url: None,
            queue_capacity: 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
