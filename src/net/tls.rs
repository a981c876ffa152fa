//! TLS certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::schema::TlsConfig;

/// Load the PEM certificate chain and private key named in the listener config.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, io::Error> {
    let cert = Path::new(&config.cert_path);
    let key = Path::new(&config.key_path);
    for (what, path) in [("certificate", cert), ("private key", key)] {
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("TLS {what} not found: {}", path.display()),
            ));
        }
    }
    RustlsConfig::from_pem_file(cert, key).await
}
