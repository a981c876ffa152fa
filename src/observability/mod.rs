//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Router, proxy, cache, analytics
//!     → logging.rs (tracing events keyed by request ID)
//!     → metrics.rs (per-backend-class counters and latency histograms)
//!
//! Consumers:
//!     → stdout (human format or JSON lines)
//!     → Prometheus scrape endpoint, when enabled
//! ```
//!
//! # Design Decisions
//! - Label sets stay small: backend class, status, cache outcome, registry
//! - Package identity never becomes a metric label
//! - Metric calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
