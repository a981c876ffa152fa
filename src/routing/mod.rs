//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, headers)
//!     → matcher.rs (hostname kind, root API paths, scope paths)
//!     → security (bot classifier, module-file access gate)
//!     → router.rs (RouteDecision: backend class + path rewrite)
//!     → proxy (app backend or object storage)
//!
//! Table Compilation (at startup):
//!     RoutingConfig
//!     → HostTable, BotClassifier, RegionSelector, CORS/security tables
//!     → Freeze inside an immutable EdgeRouter
//! ```
//!
//! # Design Decisions
//! - Tables compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - Deterministic: same request always lands on the same class
//! - Root hostname precedence: API paths, then bots, then the module gate

pub mod class;
pub mod matcher;
pub mod router;

pub use class::{BackendClass, PathRewrite};
pub use router::{EdgeRouter, RouteDecision, RouteError};
