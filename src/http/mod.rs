//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing, panic recovery)
//!     → request.rs (RequestContext: host, path, fetch metadata, PoP, client IP)
//!     → [routing decides backend class]
//!     → [proxy fetches from app backend or object storage]
//!     → response.rs (plain-text errors, diagnostic headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use server::{EdgeServer, HEALTH_PATH};
