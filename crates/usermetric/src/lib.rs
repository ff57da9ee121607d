//! Top-level facade crate for the user metric service.
//!
//! Re-exports core types and the gateway library so users can depend on a single crate.

pub mod core {
    pub use usermetric_core::*;
}

pub mod gateway {
    pub use usermetric_gateway::*;
}
