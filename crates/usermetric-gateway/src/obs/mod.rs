//! In-process request metrics and the drain flag behind `/readyz`.
//!
//! Metrics are atomics keyed by label sets and rendered in Prometheus text
//! format by the `/metrics` handler.

pub mod layer;
pub mod metrics;

pub use layer::{track_requests, ErrorTag};
pub use metrics::GatewayMetrics;
