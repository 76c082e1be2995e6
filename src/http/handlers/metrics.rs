//! Metrics handler resolving the endpoint's content source.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, error};

use crate::http::state::EndpointState;

/// Content type of the Prometheus text exposition format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handle a scrape by resolving exactly one body from the bound source.
///
/// # Parameters
///
/// - `state` - Endpoint state with the content source
///
/// # Returns
///
/// Returns the body with the exposition content type, or 500 if resolution fails.
pub async fn metrics(State(state): State<EndpointState>) -> impl IntoResponse {
    match state.source.resolve() {
        Ok(body) => {
            debug!(endpoint = %state.name, mode = %state.source.mode(), bytes = body.len(), "scrape");
            (StatusCode::OK, [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            error!(endpoint = %state.name, "failed to resolve metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("failed to resolve metrics: {e}"))
                .into_response()
        }
    }
}
