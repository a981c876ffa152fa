//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → bot.rs (crawler? then frontend only)
//!     → access_gate.rs (may this read raw module files?)
//!     → cors.rs (preflight answered at the edge)
//! Outgoing response:
//!     → headers.rs (CSP / nosniff / robots per backend class)
//!     → cors.rs (allow-origin, expose, Vary)
//! ```
//!
//! # Design Decisions
//! - Fail closed: anything the gate does not recognize goes to the frontend
//! - No trust in client input: detection only ever narrows access

pub mod access_gate;
pub mod bot;
pub mod cors;
pub mod headers;

pub use access_gate::can_access_module_file;
pub use bot::BotClassifier;
pub use cors::{is_preflight, CorsPolicy};
pub use headers::SecurityHeaders;
