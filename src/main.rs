//! Registry edge router binary.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use registry_edge::analytics::sink_from_config;
use registry_edge::config::load_config;
use registry_edge::lifecycle::Shutdown;
use registry_edge::net::load_tls_config;
use registry_edge::observability::{logging, metrics};
use registry_edge::EdgeServer;

#[derive(Debug, Parser)]
#[command(name = "registry-edge", version, about = "Edge request router for the package registry")]
struct Args {
    /// TOML configuration file; defaults plus environment overrides when omitted.
    #[arg(short, long, env = "REGISTRY_EDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    if args.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "registry-edge starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        root = %config.hosts.root,
        api = %config.hosts.api,
        npm = %config.hosts.npm,
        regions = config.upstreams.regions.len(),
        cache = config.cache.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let config = Arc::new(config);
    let (sink, analytics) = sink_from_config(&config.analytics)?;
    let server = EdgeServer::new(Arc::clone(&config), sink)?;

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().trigger_on_signal());

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let tls = load_tls_config(tls).await?;
            server.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    // The server owned the last sender; the worker flushes its queue and exits.
    if let Some(analytics) = analytics {
        if let Err(e) = analytics.await {
            tracing::warn!(error = %e, "Analytics worker ended abnormally");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
