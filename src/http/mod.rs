//! Per-endpoint HTTP surface: landing page, metrics and health.

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::EndpointState;
