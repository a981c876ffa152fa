//! Download analytics.
//!
//! # Data Flow
//! ```text
//! Successful GET/HEAD on modules or npm
//!     → tracker.rs (match path, build DownloadEvent)
//!     → metrics (edge_downloads_total)
//!     → sink.rs (bounded queue → background POST)
//! ```
//!
//! # Design Decisions
//! - Fire-and-forget: the response never waits on analytics
//! - Pattern misses are not errors

pub mod sink;
pub mod tracker;

pub use sink::{sink_from_config, DownloadSink, HttpSink, MemorySink, NoopSink};
pub use tracker::{parse_download_path, DownloadEvent, DownloadTracker, RegistryKind};
