//! Command-line interface definitions for the fake metrics server.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

use fake_metrics_rs::supervisor::{DEFAULT_BASE_PORT, DEFAULT_MAX_PORT_PROBES};
use fake_metrics_rs::SourceMode;

/// Command-line arguments for the fake metrics server.
///
/// Each input file gets its own endpoint; ports are assigned sequentially
/// from the base port, skipping ports that are already in use.
#[derive(Debug, Parser)]
#[command(name = "fake-metrics")]
#[command(author, version, about = "Fake Prometheus metrics endpoints for debugging")]
pub struct Cli {
    /// Input files, one endpoint each
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// How the input files are interpreted
    #[arg(short, long, value_enum, default_value_t = SourceMode::Static)]
    pub mode: SourceMode,

    /// Port of the first endpoint
    #[arg(short, long, default_value_t = DEFAULT_BASE_PORT)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Ports tried per endpoint before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_PORT_PROBES)]
    pub max_port_probes: u16,

    /// Jinja-style template rendered with the bound targets (e.g. a prometheus.yml)
    #[arg(long)]
    pub scrape_config_template: Option<PathBuf>,

    /// Where to write the rendered scrape config (stdout if omitted)
    #[arg(long, requires = "scrape_config_template")]
    pub scrape_config_out: Option<PathBuf>,
}
