//! # Fake Metrics Server CLI
//!
//! Serves one fake Prometheus metrics endpoint per input file until
//! interrupted.

use std::io;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use fake_metrics_rs::{scrape_config, GeneratorStore, Supervisor, SupervisorConfig};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> io::Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    // Parse CLI arguments
    let cli = Cli::parse();

    let config = SupervisorConfig::builder()
        .with_files(cli.files)
        .with_mode(cli.mode)
        .with_host(cli.host)
        .with_base_port(cli.port)
        .with_max_port_probes(cli.max_port_probes)
        .build()?;

    // One generator store for every template endpoint in the process
    let store = Arc::new(GeneratorStore::new());

    let supervisor = Supervisor::start(&config, store)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    if let Some(template) = &cli.scrape_config_template {
        scrape_config::write(template, cli.scrape_config_out.as_deref(), &supervisor.endpoints())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    }

    supervisor.serve(shutdown_signal()).await.map_err(io::Error::other)?;
    info!("all endpoints stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
