//! Endpoint supervisor: one listener per input file on sequential ports.
//!
//! Startup is split in two phases. Every input is loaded first, so a broken
//! file aborts before anything is bound. Listeners are then bound starting at
//! the base port, skipping ports already in use.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::generators::GeneratorStore;
use crate::http::{build_router, EndpointState};
use crate::source::{ContentSource, SourceError, SourceMode};

/// Default base port for the first endpoint.
pub const DEFAULT_BASE_PORT: u16 = 8888;

/// Default number of candidate ports tried per endpoint.
pub const DEFAULT_MAX_PORT_PROBES: u16 = 100;

/// Errors while starting or running the endpoints.
#[derive(Debug, Error)]
pub enum ServeError {
    /// An input failed to load; nothing was bound.
    #[error("{0}")]
    Source(#[from] SourceError),
    /// Every probed port was in use.
    #[error("no free port on {host} in {first}..={last}")]
    NoFreePort { host: IpAddr, first: u16, last: u16 },
    /// Listener or server I/O failure.
    #[error("io: {0}")]
    Io(#[from] io::Error),
}

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Input files, one endpoint each, in port order
    pub files: Vec<PathBuf>,
    /// How every input file is interpreted
    pub mode: SourceMode,
    /// Address to listen on
    pub host: IpAddr,
    /// Port tried first; 0 lets the OS pick a port for every endpoint
    pub base_port: u16,
    /// Ports tried per endpoint before giving up
    pub max_port_probes: u16,
}

impl SupervisorConfig {
    /// Get a builder for configuring the supervisor step by step.
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::new()
    }
}

/// Builder for constructing SupervisorConfig with fluent interface.
#[derive(Default)]
pub struct SupervisorConfigBuilder {
    files: Vec<PathBuf>,
    mode: Option<SourceMode>,
    host: Option<IpAddr>,
    base_port: Option<u16>,
    max_port_probes: Option<u16>,
}

impl SupervisorConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add input files.
    pub fn with_files(mut self, files: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        self.files.extend(files.into_iter().map(Into::into));
        self
    }

    /// Set the source mode.
    pub fn with_mode(mut self, mode: SourceMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the listen address.
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    /// Set the base port.
    pub fn with_base_port(mut self, port: u16) -> Self {
        self.base_port = Some(port);
        self
    }

    /// Set the per-endpoint port probe budget.
    pub fn with_max_port_probes(mut self, probes: u16) -> Self {
        self.max_port_probes = Some(probes);
        self
    }

    /// Build the final SupervisorConfig with validation.
    ///
    /// # Errors
    ///
    /// Returns error if no input file is given or the probe budget is zero.
    pub fn build(self) -> io::Result<SupervisorConfig> {
        if self.files.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "At least one input file is required",
            ));
        }

        let max_port_probes = self.max_port_probes.unwrap_or(DEFAULT_MAX_PORT_PROBES);
        if max_port_probes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Port probe budget must be at least 1",
            ));
        }

        Ok(SupervisorConfig {
            files: self.files,
            mode: self.mode.unwrap_or_default(),
            host: self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            base_port: self.base_port.unwrap_or(DEFAULT_BASE_PORT),
            max_port_probes,
        })
    }
}

/// Where one endpoint ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Input file
    pub path: PathBuf,
    /// Mode the file was loaded with
    pub mode: SourceMode,
    /// Bound address
    pub addr: SocketAddr,
}

struct BoundEndpoint {
    info: EndpointInfo,
    listener: TcpListener,
    state: EndpointState,
}

/// A set of loaded and bound endpoints, ready to serve.
pub struct Supervisor {
    endpoints: Vec<BoundEndpoint>,
}

impl Supervisor {
    /// Load every input, then bind one listener per input.
    ///
    /// # Parameters
    ///
    /// - `config` - Inputs, mode and port settings
    /// - `store` - Generator state shared by all template endpoints
    ///
    /// # Errors
    ///
    /// Returns [`ServeError::Source`] before binding anything if an input
    /// fails to load, or a port error if a listener cannot be bound.
    pub async fn start(
        config: &SupervisorConfig,
        store: Arc<GeneratorStore>,
    ) -> Result<Self, ServeError> {
        let sources = load_sources(config, &store)?;

        let mut endpoints = Vec::with_capacity(sources.len());
        let mut next_port = config.base_port;
        for (path, source) in config.files.iter().zip(sources) {
            let listener = bind_available(config.host, next_port, config.max_port_probes).await?;
            let addr = listener.local_addr()?;
            if config.base_port != 0 {
                next_port = addr.port().saturating_add(1);
            }

            let mode = source.mode();
            let state = EndpointState::builder()
                .with_name(path.display().to_string())
                .with_source(source)
                .build()?;
            endpoints.push(BoundEndpoint {
                info: EndpointInfo { path: path.clone(), mode, addr },
                listener,
                state,
            });
        }

        Ok(Self { endpoints })
    }

    /// Bound endpoints in input order.
    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        self.endpoints.iter().map(|endpoint| endpoint.info.clone()).collect()
    }

    /// Serve every endpoint until `shutdown` resolves or a server fails.
    ///
    /// # Errors
    ///
    /// Returns the first server I/O failure.
    pub async fn serve<F>(self, shutdown: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(());
        let mut servers = JoinSet::new();

        for endpoint in self.endpoints {
            let mut stop_rx = stop_rx.clone();
            let app = build_router(endpoint.state);
            info!(
                file = %endpoint.info.path.display(),
                mode = %endpoint.info.mode,
                "serving fake metrics on http://{}/metrics",
                endpoint.info.addr
            );
            servers.spawn(async move {
                axum::serve(endpoint.listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = stop_rx.changed().await;
                    })
                    .await
            });
        }
        drop(stop_rx);

        tokio::spawn(async move {
            shutdown.await;
            let _ = stop_tx.send(());
        });

        while let Some(joined) = servers.join_next().await {
            joined.map_err(io::Error::other)??;
        }
        Ok(())
    }
}

/// Load every configured input with the configured mode.
///
/// # Errors
///
/// Returns the first load failure.
pub fn load_sources(
    config: &SupervisorConfig,
    store: &Arc<GeneratorStore>,
) -> Result<Vec<ContentSource>, SourceError> {
    config
        .files
        .iter()
        .map(|path| {
            let source = ContentSource::load(config.mode, path, store)?;
            info!(file = %path.display(), mode = %config.mode, "loaded input");
            Ok(source)
        })
        .collect()
}

/// Bind the lowest free port at or above `base`, trying at most `max_probes`
/// candidates.
///
/// # Errors
///
/// Returns [`ServeError::NoFreePort`] if every candidate is in use, or the
/// bind error for any failure other than the address being in use.
pub async fn bind_available(
    host: IpAddr,
    base: u16,
    max_probes: u16,
) -> Result<TcpListener, ServeError> {
    let mut port = base;
    let mut last = base;
    for _ in 0..max_probes {
        last = port;
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                warn!(port, "port in use, trying next");
            }
            Err(e) => return Err(ServeError::Io(e)),
        }
        port = match port.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    Err(ServeError::NoFreePort { host, first: base, last })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::NamedTempFile;

    use super::*;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn temp_with(content: &str) -> NamedTempFile {
        let temp_file = NamedTempFile::new().expect("create temp file");
        fs::write(&temp_file, content).expect("write temp file");
        temp_file
    }

    #[test]
    fn test_config_validation() {
        let err = SupervisorConfig::builder().build().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let err = SupervisorConfig::builder()
            .with_files(["metrics.txt"])
            .with_max_port_probes(0)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let config =
            SupervisorConfig::builder().with_files(["a.txt", "b.txt"]).build().expect("valid");
        assert_eq!(config.files.len(), 2);
        assert_eq!(config.mode, SourceMode::Static);
        assert_eq!(config.base_port, DEFAULT_BASE_PORT);
        assert_eq!(config.host, LOCALHOST);
    }

    /// A busy port is skipped in favor of the next one.
    #[tokio::test]
    async fn test_bind_skips_busy_port() {
        let busy = TcpListener::bind((LOCALHOST, 0)).await.expect("bind ephemeral");
        let busy_port = busy.local_addr().expect("local addr").port();

        match bind_available(LOCALHOST, busy_port, 10).await {
            Ok(listener) => {
                let port = listener.local_addr().expect("local addr").port();
                assert!(port > busy_port && port <= busy_port.saturating_add(10));
            }
            // Every neighbour may be taken on a crowded host.
            Err(ServeError::NoFreePort { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_bind_gives_up_after_budget() {
        let busy = TcpListener::bind((LOCALHOST, 0)).await.expect("bind ephemeral");
        let busy_port = busy.local_addr().expect("local addr").port();

        let err = bind_available(LOCALHOST, busy_port, 1).await.unwrap_err();
        assert!(matches!(
            err,
            ServeError::NoFreePort { first, last, .. } if first == busy_port && last == busy_port
        ));
        assert!(err.to_string().ends_with(&format!("{busy_port}..={busy_port}")));
    }

    /// A failing export aborts startup before any port is bound.
    #[tokio::test]
    async fn test_failed_export_binds_nothing() {
        let good = temp_with(r#"{"status": "success", "data": {"resultType": "matrix", "result": []}}"#);
        let bad = temp_with(r#"{"status": "error", "errorType": "timeout", "error": "query timed out"}"#);

        let ephemeral = TcpListener::bind((LOCALHOST, 0)).await.expect("bind ephemeral");
        let base_port = ephemeral.local_addr().expect("local addr").port();
        drop(ephemeral);

        let config = SupervisorConfig::builder()
            .with_files([good.path(), bad.path()])
            .with_mode(SourceMode::Replay)
            .with_host(LOCALHOST)
            .with_base_port(base_port)
            .build()
            .expect("valid config");

        let result = Supervisor::start(&config, Arc::new(GeneratorStore::new())).await;
        assert!(matches!(result, Err(ServeError::Source(SourceError::Export { .. }))));

        // The first input was valid, yet its port was never taken.
        TcpListener::bind((LOCALHOST, base_port)).await.expect("base port still free");
    }

    /// Ephemeral mode gives every endpoint its own port.
    #[tokio::test]
    async fn test_start_assigns_distinct_ports() {
        let one = temp_with("one 1\n");
        let two = temp_with("two 2\n");
        let config = SupervisorConfig::builder()
            .with_files([one.path(), two.path()])
            .with_host(LOCALHOST)
            .with_base_port(0)
            .build()
            .expect("valid config");

        let supervisor =
            Supervisor::start(&config, Arc::new(GeneratorStore::new())).await.expect("start");
        let endpoints = supervisor.endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].path, one.path());
        assert_ne!(endpoints[0].addr.port(), endpoints[1].addr.port());
        assert!(endpoints.iter().all(|e| e.mode == SourceMode::Static));
    }
}
