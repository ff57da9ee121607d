//! Request-scoped context threaded through every store call.

pub mod request;

pub use request::{CancelGuard, RequestCtx};
