//! User metric shapes.
//!
//! - `api`: the JSON view exchanged with the client.
//! - `entity`: the stored view written to the document store.
//! - `mapping`: total, non-failing conversions between the two.

pub mod api;
pub mod entity;
pub mod mapping;

pub use api::{CommonApiHeader, UserMetricApi, UserMetricHeaderOnlyApi};
pub use entity::{CommonEntityHeader, Entity, UserMetricEntity, UserMetricEntityHeaderOnly};
