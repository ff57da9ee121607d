//! In-memory document store.
//!
//! Strongly consistent: a query issued after a completed put always sees it.

use async_trait::async_trait;
use dashmap::DashMap;

use usermetric_core::key::EntityKey;
use usermetric_core::StoreError;

use crate::context::RequestCtx;

use super::document::{compare_values, Document, Query};
use super::Datastore;

#[derive(Default)]
pub struct MemoryDatastore {
    docs: DashMap<EntityKey, Document>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self { docs: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Raw write bypassing entity encoding; used to plant documents of an older shape.
    pub fn insert_raw(&self, key: EntityKey, doc: Document) {
        self.docs.insert(key, doc);
    }

    fn run_query(&self, q: &Query) -> Vec<(EntityKey, Document)> {
        let mut rows: Vec<(EntityKey, Document)> = self
            .docs
            .iter()
            .filter(|e| q.matches(e.key(), e.value()))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();

        match &q.order {
            Some(o) => rows.sort_by(|(ka, a), (kb, b)| {
                let ord = match (a.lookup(&o.path), b.lookup(&o.path)) {
                    (Some(x), Some(y)) => compare_values(x, y),
                    _ => std::cmp::Ordering::Equal,
                };
                let ord = if o.descending { ord.reverse() } else { ord };
                ord.then_with(|| ka.cmp(kb))
            }),
            None => rows.sort_by(|(ka, _), (kb, _)| ka.cmp(kb)),
        }

        if let Some(n) = q.limit {
            rows.truncate(n);
        }
        rows
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn get(&self, ctx: &RequestCtx, key: &EntityKey) -> Result<Document, StoreError> {
        ctx.check()?;
        self.docs
            .get(key)
            .map(|d| d.value().clone())
            .ok_or(StoreError::NoSuchEntity)
    }

    async fn put(&self, ctx: &RequestCtx, key: &EntityKey, doc: Document) -> Result<EntityKey, StoreError> {
        ctx.check()?;
        self.docs.insert(key.clone(), doc);
        Ok(key.clone())
    }

    async fn query(&self, ctx: &RequestCtx, q: &Query) -> Result<Vec<(EntityKey, Document)>, StoreError> {
        ctx.check()?;
        Ok(self.run_query(q))
    }

    async fn count(&self, ctx: &RequestCtx, q: &Query) -> Result<usize, StoreError> {
        ctx.check()?;
        let n = self
            .docs
            .iter()
            .filter(|e| q.matches(e.key(), e.value()))
            .count();
        Ok(q.limit.map_or(n, |l| n.min(l)))
    }
}
