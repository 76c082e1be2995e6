//! Scrape-config generation for the bound endpoints.
//!
//! A Jinja-style template is rendered once after ports are assigned, e.g. a
//! `prometheus.yml` listing every fake endpoint as a static target. The
//! template sees:
//!
//! - `targets` - `host:port` strings in input order
//! - `endpoints` - objects with `file`, `mode`, `port` and `target`

use std::{fs, io, path::Path};

use minijinja::{context, Environment};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::supervisor::EndpointInfo;

/// Errors while generating a scrape config.
#[derive(Debug, Error)]
pub enum ScrapeConfigError {
    /// Reading the template or writing the output failed.
    #[error("io: {0}")]
    Io(#[from] io::Error),
    /// The template does not parse or render.
    #[error("template: {0}")]
    Template(#[from] minijinja::Error),
}

#[derive(Debug, Serialize)]
struct ScrapeTarget {
    file: String,
    mode: &'static str,
    port: u16,
    target: String,
}

/// Render a scrape-config template for the given endpoints.
pub fn render(source: &str, endpoints: &[EndpointInfo]) -> Result<String, ScrapeConfigError> {
    let endpoints: Vec<ScrapeTarget> = endpoints
        .iter()
        .map(|endpoint| ScrapeTarget {
            file: endpoint.path.display().to_string(),
            mode: endpoint.mode.as_str(),
            port: endpoint.addr.port(),
            target: endpoint.addr.to_string(),
        })
        .collect();
    let targets: Vec<String> = endpoints.iter().map(|endpoint| endpoint.target.clone()).collect();

    let env = Environment::new();
    Ok(env.render_str(source, context! { targets => targets, endpoints => endpoints })?)
}

/// Render the template at `template_path` and write it to `out`, or print it
/// to stdout when no output path is given.
pub fn write(
    template_path: &Path,
    out: Option<&Path>,
    endpoints: &[EndpointInfo],
) -> Result<(), ScrapeConfigError> {
    let source = fs::read_to_string(template_path)?;
    let rendered = render(&source, endpoints)?;
    match out {
        Some(path) => {
            fs::write(path, rendered)?;
            info!(file = %path.display(), "wrote scrape config");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}
