use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ingress_core::{ControllerConfig, ControllerMetrics, IngressController};
use ingress_kube::KubeClusterStore;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

mod server;

/// Publishes the external address of the node serving most of an ingress's
/// pods into the ingress's load balancer status
#[derive(Parser, Debug)]
#[command(name = "ingress-controller", version, about, long_about = None)]
struct Cli {
    /// Interval between checks (e.g. 15s, 1m)
    #[arg(long, env = "INGRESS_SYNC_INTERVAL", value_parser = humantime::parse_duration, default_value = "15s")]
    interval: Duration,

    /// Static IP address to be put on all ingresses
    #[arg(long = "ingress-ip-address", env = "INGRESS_SYNC_STATIC_ADDRESS")]
    ingress_ip_address: Option<String>,

    /// Address to serve /metrics and /healthz on; disabled when unset
    #[arg(long, env = "INGRESS_SYNC_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

impl Cli {
    fn controller_config(&self) -> ControllerConfig {
        ControllerConfig::new(self.interval).with_static_address(self.ingress_ip_address.clone())
    }
}

fn init_tracing() {
    // RUST_LOG selects the level (default info), RUST_LOG_FORMAT=json switches to JSON lines
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .compact()
                .init();
        }
    }
}

/// Resolve once SIGTERM or SIGINT arrives
async fn shutdown_signal() -> Result<()> {
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigterm.recv() => info!("Received Term signal. Terminating..."),
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("Received interrupt signal. Terminating...");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    info!("Starting ingress-controller...");

    let store = KubeClusterStore::new()
        .await
        .context("failed to connect to the Kubernetes API")?;
    debug!("Kubernetes client initialized");

    let metrics = ControllerMetrics::new()?;
    let controller = Arc::new(
        IngressController::new(Arc::new(store), cli.controller_config()).with_metrics(metrics.clone()),
    );

    let shutdown = CancellationToken::new();

    if let Some(addr) = cli.metrics_addr {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind metrics address {}", addr))?;
        tokio::spawn(server::serve(listener, metrics, shutdown.clone()));
    }

    let run = {
        let controller = controller.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { controller.run(shutdown).await })
    };

    shutdown_signal().await?;
    shutdown.cancel();

    // the current sweep finishes before the loop observes cancellation
    run.await?;
    info!("Shutdown complete");

    Ok(())
}
