//! Security response headers per backend class.
//!
//! # Responsibilities
//! - Lock down storage-backed responses (CSP, nosniff, robots, CORP)
//! - Mark API responses as non-indexable
//! - Leave the frontend's own CSP alone
//!
//! # Design Decisions
//! - Storage classes overwrite whatever the bucket returned
//! - The table is built once from config and shared read-only

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::schema::SecurityConfig;
use crate::routing::BackendClass;

const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");
const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

/// Security headers keyed by backend class.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    storage: Vec<(HeaderName, HeaderValue)>,
    api: Vec<(HeaderName, HeaderValue)>,
    frontend: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn from_config(config: &SecurityConfig) -> Self {
        let nosniff = (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        let noindex = (X_ROBOTS_TAG, HeaderValue::from_static("noindex"));

        let csp = HeaderValue::from_str(&config.storage_csp).unwrap_or_else(|_| {
            tracing::warn!("Invalid storage CSP in config, using the built-in policy");
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; sandbox")
        });

        Self {
            storage: vec![
                (header::CONTENT_SECURITY_POLICY, csp),
                nosniff.clone(),
                noindex.clone(),
                (
                    CROSS_ORIGIN_RESOURCE_POLICY,
                    HeaderValue::from_static("cross-origin"),
                ),
            ],
            api: vec![nosniff.clone(), noindex],
            frontend: vec![nosniff],
        }
    }

    /// Attach the headers for `class`, replacing any the backend sent.
    pub fn apply_security_headers(&self, headers: &mut HeaderMap, class: BackendClass) {
        let table = match class {
            BackendClass::Modules | BackendClass::Npm => &self.storage,
            BackendClass::Api => &self.api,
            BackendClass::Frontend => &self.frontend,
        };
        for (name, value) in table {
            headers.insert(name.clone(), value.clone());
        }
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classes_get_restrictive_csp() {
        let policy = SecurityHeaders::default();
        for class in [BackendClass::Modules, BackendClass::Npm] {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static("script-src *"),
            );
            policy.apply_security_headers(&mut headers, class);

            let csp = headers[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
            assert!(csp.contains("default-src 'none'"));
            assert!(csp.contains("sandbox"));
            assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
            assert_eq!(headers["x-robots-tag"], "noindex");
        }
    }

    #[test]
    fn test_api_gets_no_csp() {
        let mut headers = HeaderMap::new();
        SecurityHeaders::default().apply_security_headers(&mut headers, BackendClass::Api);

        assert!(!headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers["x-robots-tag"], "noindex");
    }

    #[test]
    fn test_frontend_keeps_its_own_csp() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        );
        SecurityHeaders::default().apply_security_headers(&mut headers, BackendClass::Frontend);

        assert_eq!(headers[header::CONTENT_SECURITY_POLICY], "default-src 'self'");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert!(!headers.contains_key("x-robots-tag"));
    }
}
