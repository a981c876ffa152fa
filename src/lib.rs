//! Edge request router for a package registry.
//!
//! Every request to the registry's public hostnames is classified into one
//! of four backend classes and proxied there:
//!
//! ```text
//!     api.<root>  ─────────────────────────────▶ api       (/api prefix)
//!     npm.<root>  ─────────────────────────────▶ npm       (object storage)
//!     <root>      ─┬─ sitemap / login paths ───▶ api
//!                  ├─ crawler ─────────────────▶ frontend
//!                  ├─ /@… + module gate allows ▶ modules   (object storage)
//!                  └─ everything else ─────────▶ frontend
//!     other host  ─────────────────────────────▶ 404
//! ```

pub mod analytics;
pub mod backends;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::schema::RoutingConfig;
pub use http::EdgeServer;
pub use lifecycle::Shutdown;
pub use routing::{BackendClass, EdgeRouter};
