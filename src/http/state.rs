//! Endpoint state shared across the handlers of one listener.

use std::io;
use std::sync::Arc;

use crate::source::ContentSource;

/// State of one endpoint.
///
/// Each listener owns its own content source; only the generator store behind
/// template sources is shared between endpoints.
#[derive(Clone, Debug)]
pub struct EndpointState {
    /// Human-readable endpoint name used in logs (usually the input file)
    pub name: Arc<str>,
    /// The single content source this endpoint is bound to
    pub source: Arc<ContentSource>,
}

impl EndpointState {
    /// Create new endpoint state.
    ///
    /// # Parameters
    ///
    /// - `name` - Endpoint name for logs
    /// - `source` - Content source to serve
    ///
    /// # Returns
    ///
    /// Returns configured `EndpointState` instance.
    pub fn new(name: impl Into<Arc<str>>, source: Arc<ContentSource>) -> Self {
        Self { name: name.into(), source }
    }

    /// Get a builder for configuring endpoint state step by step.
    pub fn builder() -> EndpointStateBuilder {
        EndpointStateBuilder::new()
    }
}

/// Builder for constructing EndpointState with fluent interface.
#[derive(Default)]
pub struct EndpointStateBuilder {
    name: Option<String>,
    source: Option<Arc<ContentSource>>,
}

impl EndpointStateBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint name used in logs.
    ///
    /// # Returns
    ///
    /// Returns the builder for method chaining.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Bind the endpoint to a content source.
    ///
    /// # Returns
    ///
    /// Returns the builder for method chaining.
    pub fn with_source(self, source: ContentSource) -> Self {
        self.with_shared_source(Arc::new(source))
    }

    /// Bind the endpoint to an already shared content source.
    pub fn with_shared_source(mut self, source: Arc<ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Build the final EndpointState with validation.
    ///
    /// # Errors
    ///
    /// Returns error if no content source is bound.
    pub fn build(self) -> io::Result<EndpointState> {
        let source = self.source.ok_or(io::Error::new(
            io::ErrorKind::InvalidInput,
            "A content source is required for EndpointState",
        ))?;
        let name = self.name.unwrap_or_else(|| source.mode().to_string());

        Ok(EndpointState::new(name, source))
    }
}

#[cfg(test)]
mod tests {
    use crate::snapshot::Snapshot;

    use super::*;

    #[test]
    fn test_builder_requires_source() {
        let err = EndpointState::builder().with_name("orphan").build().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_builder_default_name() {
        let snapshot = Snapshot::from_series(vec![]).expect("empty snapshot");
        let state = EndpointState::builder()
            .with_source(ContentSource::Snapshot(snapshot))
            .build()
            .expect("valid configuration");
        assert_eq!(&*state.name, "import");
    }
}
