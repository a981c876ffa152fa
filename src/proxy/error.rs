//! Proxy client errors.

use axum::http::StatusCode;

/// Failure while talking to a backend.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid upstream URI `{uri}`: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    #[error("invalid forwarded header value: {0}")]
    Header(#[from] axum::http::header::InvalidHeaderValue),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read upstream body: {0}")]
    Body(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to build response: {0}")]
    Http(#[from] axum::http::Error),
}

impl ProxyError {
    /// Status reported to the client.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) | ProxyError::Body(_) => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidUri { .. } | ProxyError::Header(_) | ProxyError::Http(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
