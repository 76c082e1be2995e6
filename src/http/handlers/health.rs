//! Health check handler.

/// Health check endpoint.
///
/// # Returns
///
/// Returns "ok" if the endpoint is serving.
pub async fn healthz() -> &'static str {
    "ok"
}
