//! Network layer subsystem.
//!
//! Plain TCP listeners are bound by `main`; this module only covers the
//! optional rustls termination.

pub mod tls;

pub use tls::load_tls_config;
