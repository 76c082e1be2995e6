//! HTTP handlers for the endpoint routes.

pub mod health;
pub mod index;
pub mod metrics;

// Re-export handlers for easier access
pub use health::healthz;
pub use index::index;
pub use metrics::metrics;
