//! Document store adapter.
//!
//! The lifecycle controller only talks to the [`Datastore`] trait: get/put by
//! key, filtered+ordered+limited queries and counts over property documents.
//! Typed access with drift-tolerant decoding lives in [`typed`]; the shipped
//! backend is the in-memory [`MemoryDatastore`].

pub mod curator;
pub mod document;
pub mod memory;
pub mod typed;

use async_trait::async_trait;

use usermetric_core::key::EntityKey;
use usermetric_core::StoreError;

use crate::context::RequestCtx;

pub use curator::{CuratorRegistry, DatastoreCuratorRegistry};
pub use document::{Document, Filter, FilterOp, Order, Query};
pub use memory::MemoryDatastore;

/// Persistence operations over an external document store.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Load the document at `key`; `StoreError::NoSuchEntity` if absent.
    async fn get(&self, ctx: &RequestCtx, key: &EntityKey) -> Result<Document, StoreError>;

    /// Blind write of `doc` at `key`.
    async fn put(&self, ctx: &RequestCtx, key: &EntityKey, doc: Document) -> Result<EntityKey, StoreError>;

    /// Run `q` and return matching documents with their keys, in query order.
    async fn query(&self, ctx: &RequestCtx, q: &Query) -> Result<Vec<(EntityKey, Document)>, StoreError>;

    /// Number of documents matching `q` (limit applies).
    async fn count(&self, ctx: &RequestCtx, q: &Query) -> Result<usize, StoreError>;
}
