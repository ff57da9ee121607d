//! usermetric core: wire shapes, stored shapes, key namespace and the shared
//! error surface of the user metric resource.
//!
//! This crate carries no transport or runtime dependencies so the gateway,
//! alternative store backends and test tooling can all share one definition
//! of what a user metric looks like on the wire and at rest.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `UserMetricError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod key;
pub mod model;

/// Shared result type.
pub use error::{Result, StoreError, UserMetricError};
