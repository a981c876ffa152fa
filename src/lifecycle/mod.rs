//! Process lifecycle.
//!
//! # Data Flow
//! ```text
//! Ctrl+C / SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains in-flight requests
//!     → analytics worker flushes its queue and exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
