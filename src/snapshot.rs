//! One-shot import of an instant-vector export into exposition text.

use indexmap::IndexMap;

use crate::export::{ExportError, InstantSeries, QueryResponse};
use crate::metric::MetricIdentity;

/// Exposition text rendered from a single instant-vector snapshot.
///
/// The body is computed once at load time and served unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    body: String,
}

impl Snapshot {
    /// Render a snapshot from a loaded export.
    ///
    /// # Errors
    ///
    /// Fails if the export status is not `success`, the result type is not
    /// `vector`, or a series has no `__name__` label.
    pub fn from_export(export: QueryResponse) -> Result<Self, ExportError> {
        Self::from_series(export.into_vector()?)
    }

    /// Render a snapshot from instant-vector series, one line per identity.
    pub fn from_series(series: Vec<InstantSeries>) -> Result<Self, ExportError> {
        let mut lines: IndexMap<MetricIdentity, String> = IndexMap::with_capacity(series.len());
        for InstantSeries { metric, value } in series {
            lines.insert(MetricIdentity::from_label_map(&metric)?, value.1);
        }

        let body = lines.iter().map(|(identity, value)| format!("{identity} {value}\n")).collect();
        Ok(Self { body })
    }

    /// The rendered exposition text.
    pub fn body(&self) -> &str {
        &self.body
    }
}
