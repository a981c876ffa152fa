//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router: health probe plus one catch-all handler
//! - Wire up middleware (request ID, tracing, panic recovery)
//! - Serve plain TCP or rustls-terminated TLS
//! - Stop accepting and drain on the shutdown signal

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, Request, Response, StatusCode},
    response::IntoResponse,
    routing::{any, get},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::analytics::DownloadSink;
use crate::config::{ConfigError, RoutingConfig};
use crate::http::request::{EdgeRequestId, X_REQUEST_ID};
use crate::http::response::plain_text;
use crate::routing::EdgeRouter;

/// Path of the router's own liveness probe.
pub const HEALTH_PATH: &str = "/_edge/health";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<EdgeRouter>,
}

/// The inbound HTTP server.
pub struct EdgeServer {
    app: Router,
}

impl EdgeServer {
    pub fn new(config: Arc<RoutingConfig>, sink: Arc<dyn DownloadSink>) -> Result<Self, ConfigError> {
        Ok(Self::with_router(Arc::new(EdgeRouter::new(config, sink)?)))
    }

    pub fn with_router(router: Arc<EdgeRouter>) -> Self {
        Self {
            app: build_app(AppState { router }),
        }
    }

    /// The fully layered Axum router.
    pub fn app(&self) -> Router {
        self.app.clone()
    }

    /// Serve plain HTTP until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Edge server starting");

        let app = self.app.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Edge server draining");
            })
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }

    /// Serve HTTPS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        tracing::info!(address = %addr, "Edge server starting (TLS)");

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Edge server draining");
            drain.graceful_shutdown(None);
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.app.into_make_service_with_connect_info::<SocketAddr>())
            .await?;

        tracing::info!("Edge server stopped");
        Ok(())
    }
}

fn build_app(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route("/{*path}", any(edge_handler))
        .route("/", any(edge_handler))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID)))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(X_REQUEST_ID),
            EdgeRequestId,
        ))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Every proxied request lands here.
async fn edge_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    state.router.route(request, peer).await
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Request handler panicked");
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}
