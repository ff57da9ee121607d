//! HTTP transport for the `/usermetric` resource.
//!
//! - `codec`: request body and query parameter decoding
//! - `http`: axum handlers and the error -> status translation

pub mod codec;
pub mod http;
