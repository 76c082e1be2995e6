//! HTTP routing configuration for one fake metrics endpoint.

use axum::{routing::get, Router};

use crate::http::handlers::*;
use crate::http::state::EndpointState;

/// Build the Axum router for one endpoint.
///
/// # Parameters
///
/// - `state` - Endpoint state holding the bound content source
///
/// # Returns
///
/// Returns a `Router` serving `/`, `/metrics` and `/healthz`.
pub fn build_router(state: EndpointState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(state)
}
