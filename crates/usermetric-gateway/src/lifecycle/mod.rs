//! User metric lifecycle: create, replace, fetch, list, count, soft-delete, curate.

pub mod clock;
pub mod controller;

pub use clock::{Clock, SystemClock};
pub use controller::{UserMetricService, MAX_HEADERS_PER_CALL};
