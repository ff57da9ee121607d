//! usermetric gateway library entry.
//!
//! This crate wires the document store adapter, curator registry, lifecycle
//! controller and HTTP transport into the `/usermetric` service. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod obs;
pub mod ops;
pub mod router;
pub mod store;
pub mod transport;
