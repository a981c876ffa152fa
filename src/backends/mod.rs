//! Backend selection subsystem.
//!
//! # Data Flow
//! ```text
//! Point-of-presence code (from edge header)
//!     → region.rs (static PoP → region table, default on miss)
//!     → pool.rs (region → frontend/API base URLs)
//!     → proxy client
//! ```
//!
//! # Design Decisions
//! - All regions are equivalent; a lookup miss only costs locality
//! - Tables are built once at startup and never change

pub mod pool;
pub mod region;

pub use pool::{RegionBackends, UpstreamPool};
pub use region::RegionSelector;
