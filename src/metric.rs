//! Metric identities in Prometheus exposition form.
//!
//! A metric identity is the canonical `name{label="value",...}` string of one
//! series. Labels keep the order they had in the source data and `__name__`
//! is lifted out of the label set to become the name.

use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

/// Reserved label carrying the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Errors while canonicalizing a label set.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    /// The label set has no `__name__` entry.
    #[error("__name__ must be a key in metric labels")]
    MissingName,
}

/// A metric label representing a name=value pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    /// Create a new label with the given name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into() }
    }
}

/// Canonical identity of one series, e.g. `up{job="api"}`.
///
/// Two identities are equal iff their canonical strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricIdentity(String);

impl MetricIdentity {
    /// Build an identity from a name and ordered labels.
    ///
    /// # Parameters
    ///
    /// - `name` - Metric name
    /// - `labels` - Labels in output order, `__name__` excluded
    ///
    /// # Returns
    ///
    /// Returns the canonical identity; label values are escaped for the
    /// exposition format.
    pub fn new<'a>(name: &str, labels: impl IntoIterator<Item = &'a Label>) -> Self {
        let rendered: Vec<String> = labels
            .into_iter()
            .map(|label| format!("{}=\"{}\"", label.name, escape_label_value(&label.value)))
            .collect();
        Self(format!("{name}{{{}}}", rendered.join(",")))
    }

    /// Build an identity from a label mapping as found in query responses.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::MissingName`] if the mapping has no `__name__` key.
    pub fn from_label_map(metric: &IndexMap<String, String>) -> Result<Self, MetricError> {
        let name = metric.get(METRIC_NAME_LABEL).ok_or(MetricError::MissingName)?;
        let labels: Vec<Label> = metric
            .iter()
            .filter(|(key, _)| key.as_str() != METRIC_NAME_LABEL)
            .map(|(key, value)| Label::new(key.as_str(), value.as_str()))
            .collect();
        Ok(Self::new(name, &labels))
    }

    /// The canonical string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MetricIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}
