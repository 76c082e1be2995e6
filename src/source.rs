//! Content sources an endpoint can serve from.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::ValueEnum;
use thiserror::Error;

use crate::export::{ExportError, QueryResponse};
use crate::generators::GeneratorStore;
use crate::replay::ReplaySequence;
use crate::snapshot::Snapshot;
use crate::template::{TemplateError, TemplateHandle};

/// How an input file is turned into a metrics body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SourceMode {
    /// Echo the file as-is.
    #[default]
    Static,
    /// Render the file as a Jinja-style template on every scrape.
    Template,
    /// Convert an instant-vector JSON export once.
    Import,
    /// Replay a range-vector JSON export, one sample per scrape.
    Replay,
}

impl SourceMode {
    /// Lowercase mode name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Template => "template",
            Self::Import => "import",
            Self::Replay => "replay",
        }
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load-time failure for one input file.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input file could not be read.
    #[error("{}: io: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    /// The file is not a usable query export for the chosen mode.
    #[error("{}: {source}", .path.display())]
    Export { path: PathBuf, source: ExportError },
    /// The file does not parse as a template.
    #[error("{}: template {source}", .path.display())]
    Template { path: PathBuf, source: TemplateError },
}

/// Per-scrape failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Rendering the template failed, e.g. a generator got a bad argument.
    #[error("template {0}")]
    Template(#[from] TemplateError),
}

/// The single content source an endpoint is bound to.
#[derive(Debug)]
pub enum ContentSource {
    /// File content read once at load time.
    StaticFile { path: PathBuf, body: String },
    /// Template rendered on every scrape.
    Template(TemplateHandle),
    /// Imported instant-vector snapshot.
    Snapshot(Snapshot),
    /// Recorded range-vector export consumed one sample per scrape.
    Replay(ReplaySequence),
}

impl ContentSource {
    /// Load a source from an input file.
    ///
    /// # Parameters
    ///
    /// - `mode` - How to interpret the file
    /// - `path` - Input file
    /// - `store` - Generator state shared by all template sources
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] tagged with `path` if the file cannot be
    /// read, parsed or does not have the shape the mode requires.
    pub fn load(
        mode: SourceMode,
        path: impl AsRef<Path>,
        store: &Arc<GeneratorStore>,
    ) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let export_error = |source| SourceError::Export { path: path.to_path_buf(), source };
        match mode {
            SourceMode::Static => {
                let body = fs::read_to_string(path)
                    .map_err(|source| SourceError::Io { path: path.to_path_buf(), source })?;
                Ok(Self::StaticFile { path: path.to_path_buf(), body })
            }
            SourceMode::Template => TemplateHandle::load_from_path(path, store.clone())
                .map(Self::Template)
                .map_err(|source| SourceError::Template { path: path.to_path_buf(), source }),
            SourceMode::Import => QueryResponse::load_from_path(path)
                .and_then(Snapshot::from_export)
                .map(Self::Snapshot)
                .map_err(export_error),
            SourceMode::Replay => QueryResponse::load_from_path(path)
                .and_then(ReplaySequence::from_export)
                .map(Self::Replay)
                .map_err(export_error),
        }
    }

    /// The mode this source was loaded with.
    pub const fn mode(&self) -> SourceMode {
        match self {
            Self::StaticFile { .. } => SourceMode::Static,
            Self::Template(_) => SourceMode::Template,
            Self::Snapshot(_) => SourceMode::Import,
            Self::Replay(_) => SourceMode::Replay,
        }
    }

    /// Produce the body for one scrape.
    ///
    /// Template and replay sources mutate their state on every call.
    pub fn resolve(&self) -> Result<String, ResolveError> {
        match self {
            Self::StaticFile { body, .. } => Ok(body.clone()),
            Self::Template(handle) => Ok(handle.render()?),
            Self::Snapshot(snapshot) => Ok(snapshot.body().to_string()),
            Self::Replay(sequence) => Ok(sequence.scrape()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::NamedTempFile;

    use super::*;

    fn temp_with(content: &str) -> NamedTempFile {
        let temp_file = NamedTempFile::new().expect("create temp file");
        fs::write(&temp_file, content).expect("write temp file");
        temp_file
    }

    /// Static content is captured at load time.
    #[test]
    fn test_static_no_live_reload() {
        let file = temp_with("up 1\n");
        let store = Arc::new(GeneratorStore::new());
        let source = ContentSource::load(SourceMode::Static, &file, &store).expect("load");
        assert_eq!(source.mode(), SourceMode::Static);

        fs::write(&file, "up 0\n").expect("rewrite temp file");
        assert_eq!(source.resolve().expect("resolve"), "up 1\n");
    }

    #[test]
    fn test_template_resolves_fresh_each_time() {
        let file = temp_with("hits {{ increase('hits') | int }}\n");
        let store = Arc::new(GeneratorStore::new());
        let source = ContentSource::load(SourceMode::Template, &file, &store).expect("load");

        assert_eq!(source.resolve().expect("resolve"), "hits 0");
        assert_eq!(source.resolve().expect("resolve"), "hits 1");
        assert_eq!(store.get("hits"), Some(1.0));
    }

    #[test]
    fn test_replay_source() {
        let file = temp_with(
            r#"{"status": "success", "data": {"resultType": "matrix", "result": [
                {"metric": {"__name__": "m", "job": "j"}, "values": [[1, "10"], [2, "20"], [3, "30"]]}
            ]}}"#,
        );
        let store = Arc::new(GeneratorStore::new());
        let source = ContentSource::load(SourceMode::Replay, &file, &store).expect("load");

        let bodies: Vec<String> = (0..4).map(|_| source.resolve().expect("resolve")).collect();
        assert_eq!(
            bodies,
            vec!["m{job=\"j\"} 10\n", "m{job=\"j\"} 20\n", "m{job=\"j\"} 30\n", "m{job=\"j\"} 30\n"]
        );
    }

    #[test]
    fn test_import_source() {
        let file = temp_with(
            r#"{"status": "success", "data": {"resultType": "vector", "result": [
                {"metric": {"__name__": "up"}, "value": [1, "1"]}
            ]}}"#,
        );
        let store = Arc::new(GeneratorStore::new());
        let source = ContentSource::load(SourceMode::Import, &file, &store).expect("load");
        assert_eq!(source.mode(), SourceMode::Import);
        assert_eq!(source.resolve().expect("resolve"), "up{} 1\n");
        assert_eq!(source.resolve().expect("resolve"), "up{} 1\n");
    }

    #[test]
    fn test_load_errors_carry_path() {
        let store = Arc::new(GeneratorStore::new());

        let err = ContentSource::load(SourceMode::Static, "/nonexistent/metrics.txt", &store)
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().starts_with("/nonexistent/metrics.txt: io:"));

        let failed = temp_with(r#"{"status": "error", "error": "boom"}"#);
        let err = ContentSource::load(SourceMode::Replay, &failed, &store).unwrap_err();
        assert!(matches!(err, SourceError::Export { source: ExportError::Status { .. }, .. }));

        let broken = temp_with("{% for %}");
        let err = ContentSource::load(SourceMode::Template, &broken, &store).unwrap_err();
        assert!(matches!(err, SourceError::Template { source: TemplateError::Syntax(_), .. }));
    }

    /// A failing render surfaces as a resolve error.
    #[test]
    fn test_template_render_error() {
        let file = temp_with("{{ chance('x', probability=0) }}");
        let store = Arc::new(GeneratorStore::new());
        let source = ContentSource::load(SourceMode::Template, &file, &store).expect("load");
        assert!(matches!(source.resolve(), Err(ResolveError::Template(TemplateError::Render(_)))));
    }
}
