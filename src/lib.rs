//! # Fake Metrics Library
//!
//! Impersonates Prometheus-compatible metrics endpoints for debugging a
//! monitoring stack without a live target.
//!
//! Every endpoint serves one input file in one of four modes:
//! - **Static**: echoes a text file captured at startup
//! - **Template**: renders a Jinja-style template whose generator functions
//!   (`increase`, `reset`, `chance`, `increase_or_reset`) keep state across scrapes
//! - **Import**: converts an instant-vector JSON export into exposition text
//! - **Replay**: plays back a range-vector JSON export one sample per scrape,
//!   then freezes on the last value
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use fake_metrics_rs::{GeneratorStore, SourceMode, Supervisor, SupervisorConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SupervisorConfig::builder()
//!     .with_files(["counters.j2"])
//!     .with_mode(SourceMode::Template)
//!     .build()?;
//!
//! let supervisor = Supervisor::start(&config, Arc::new(GeneratorStore::new())).await?;
//! supervisor.serve(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod generators;
pub mod http;
pub mod metric;
pub mod replay;
pub mod scrape_config;
pub mod snapshot;
pub mod source;
pub mod supervisor;
pub mod template;

// Re-export commonly used types for convenience
pub use generators::{GeneratorError, GeneratorStore, RandomSource};
pub use metric::{Label, MetricIdentity};
pub use replay::{ReplaySequence, ReplayState};
pub use snapshot::Snapshot;
pub use source::{ContentSource, SourceMode};
pub use supervisor::{Supervisor, SupervisorConfig};
pub use template::TemplateHandle;
