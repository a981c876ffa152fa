//! Backend classes a request can be routed to.

use std::fmt;

/// One of the four routable destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendClass {
    /// JSON API service.
    Api,
    /// Dynamically rendered frontend.
    Frontend,
    /// Object-storage bucket with published module files.
    Modules,
    /// Object-storage bucket with the npm compatibility view.
    Npm,
}

impl BackendClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendClass::Api => "api",
            BackendClass::Frontend => "frontend",
            BackendClass::Modules => "modules",
            BackendClass::Npm => "npm",
        }
    }

    /// Whether responses come straight from object storage (untrusted content).
    pub fn is_storage(&self) -> bool {
        matches!(self, BackendClass::Modules | BackendClass::Npm)
    }
}

impl fmt::Display for BackendClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound path transformation applied by the proxy client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRewrite {
    /// Forward the path unchanged.
    Identity,
    /// Prefix the path with `/api` (API hostname).
    ApiPrefix,
}

impl PathRewrite {
    pub fn apply(&self, path: &str) -> String {
        match self {
            PathRewrite::Identity => path.to_string(),
            PathRewrite::ApiPrefix if path == "/" => "/api".to_string(),
            PathRewrite::ApiPrefix => format!("/api{}", path),
        }
    }
}
