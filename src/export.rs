//! Prometheus query-response documents as exported from `/api/v1/query` and
//! `/api/v1/query_range`.

use std::{fmt, fs, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::metric::MetricError;

/// Errors that can occur when loading or interpreting an export.
#[derive(Debug, Error)]
pub enum ExportError {
    /// I/O error while reading the export file.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error, including missing fields.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// The export's top-level status is not `success`.
    #[error("export status is {status:?}, expected \"success\"{}", describe_error(.error_type, .error))]
    Status { status: String, error_type: Option<String>, error: Option<String> },
    /// A successful export without a `data` section.
    #[error("export has no data section")]
    MissingData,
    /// The result shape does not fit the requested mode.
    #[error("unsupported result type {found:?}, expected {expected}")]
    ResultType { expected: ResultType, found: String },
    /// A series could not be turned into a metric identity.
    #[error("metric: {0}")]
    Metric(#[from] MetricError),
}

fn describe_error(error_type: &Option<String>, error: &Option<String>) -> String {
    match (error_type, error) {
        (Some(kind), Some(msg)) => format!(" ({kind}: {msg})"),
        (None, Some(msg)) => format!(" ({msg})"),
        (Some(kind), None) => format!(" ({kind})"),
        (None, None) => String::new(),
    }
}

/// Result shapes a query response can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    /// One sample per series.
    Vector,
    /// An ordered list of samples per series.
    Matrix,
}

impl ResultType {
    /// Name used in the `resultType` field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vector => "vector",
            Self::Matrix => "matrix",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// Top-level query response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    /// Response status ("success" | "error")
    pub status: String,
    /// Response data payload
    pub data: Option<QueryData>,
    /// Error type
    #[serde(rename = "errorType")]
    pub error_type: Option<String>,
    /// Error message
    pub error: Option<String>,
}

/// The `data` section of a query response.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
    /// Declared result shape
    #[serde(rename = "resultType")]
    pub result_type: String,
    /// Series payload, interpreted according to `result_type`
    pub result: serde_json::Value,
}

/// A `[timestamp, "value"]` pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplePair(pub f64, pub String);

impl SamplePair {
    /// The sample value exactly as exported.
    pub fn value(&self) -> &str {
        &self.1
    }
}

/// One series of an instant vector.
#[derive(Debug, Clone, Deserialize)]
pub struct InstantSeries {
    pub metric: IndexMap<String, String>,
    pub value: SamplePair,
}

/// One series of a range vector.
#[derive(Debug, Clone, Deserialize)]
pub struct RangeSeries {
    pub metric: IndexMap<String, String>,
    pub values: Vec<SamplePair>,
}

impl QueryResponse {
    /// Load a query response from a JSON file.
    ///
    /// # Parameters
    ///
    /// - `path` - Path to the JSON export
    ///
    /// # Returns
    ///
    /// Returns the parsed document; no status or shape checks are applied yet.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ExportError> {
        let txt = fs::read_to_string(path)?;
        Self::parse(&txt)
    }

    /// Parse a query response from JSON text.
    pub fn parse(txt: &str) -> Result<Self, ExportError> {
        Ok(serde_json::from_str(txt)?)
    }

    /// Series of an instant-vector response.
    ///
    /// # Errors
    ///
    /// Fails if the status is not `success` or the result is not a vector.
    pub fn into_vector(self) -> Result<Vec<InstantSeries>, ExportError> {
        let result = self.into_result(ResultType::Vector)?;
        Ok(serde_json::from_value(result)?)
    }

    /// Series of a range-vector response.
    ///
    /// # Errors
    ///
    /// Fails if the status is not `success` or the result is not a matrix.
    pub fn into_matrix(self) -> Result<Vec<RangeSeries>, ExportError> {
        let result = self.into_result(ResultType::Matrix)?;
        Ok(serde_json::from_value(result)?)
    }

    fn into_result(self, expected: ResultType) -> Result<serde_json::Value, ExportError> {
        if self.status != "success" {
            return Err(ExportError::Status {
                status: self.status,
                error_type: self.error_type,
                error: self.error,
            });
        }
        let data = self.data.ok_or(ExportError::MissingData)?;
        if data.result_type != expected.as_str() {
            return Err(ExportError::ResultType { expected, found: data.result_type });
        }
        Ok(data.result)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::NamedTempFile;

    use super::*;

    const MATRIX: &str = r#"{
        "status": "success",
        "data": {
            "resultType": "matrix",
            "result": [
                {
                    "metric": {"__name__": "up", "job": "test"},
                    "values": [[1640995200, "1"], [1640995230.5, "0"]]
                }
            ]
        }
    }"#;

    #[test]
    fn test_load_matrix_from_file() {
        let temp_file = NamedTempFile::new().expect("create temp file");
        fs::write(&temp_file, MATRIX).expect("write temp file");

        let series = QueryResponse::load_from_path(&temp_file)
            .expect("load export")
            .into_matrix()
            .expect("matrix result");
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].metric["job"], "test");
        assert_eq!(series[0].values[1], SamplePair(1640995230.5, "0".to_string()));
    }

    #[test]
    fn test_vector_as_matrix_is_rejected() {
        let txt = r#"{"status": "success", "data": {"resultType": "vector", "result": []}}"#;
        let err = QueryResponse::parse(txt).expect("valid json").into_matrix().unwrap_err();
        assert!(matches!(
            err,
            ExportError::ResultType { expected: ResultType::Matrix, ref found } if found == "vector"
        ));
    }

    #[test]
    fn test_error_status_is_rejected() {
        let txt = r#"{"status": "error", "errorType": "bad_data", "error": "parse error"}"#;
        let err = QueryResponse::parse(txt).expect("valid json").into_vector().unwrap_err();
        assert!(matches!(err, ExportError::Status { ref status, .. } if status == "error"));
        assert_eq!(
            err.to_string(),
            r#"export status is "error", expected "success" (bad_data: parse error)"#
        );
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(QueryResponse::parse(r#"{"data": {}}"#), Err(ExportError::Json(_))));
        assert!(matches!(QueryResponse::parse("not json"), Err(ExportError::Json(_))));

        let no_data = QueryResponse::parse(r#"{"status": "success"}"#).expect("valid json");
        assert!(matches!(no_data.into_vector(), Err(ExportError::MissingData)));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = QueryResponse::load_from_path("/nonexistent/export.json");
        assert!(matches!(result, Err(ExportError::Io(_))));
    }
}
