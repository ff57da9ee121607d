//! Curator registry: existence-only marks keyed by creator identity.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use usermetric_core::key::EntityKey;
use usermetric_core::model::Entity;
use usermetric_core::StoreError;

use crate::context::RequestCtx;

use super::document::{Filter, Query};
use super::typed::{count_entities, put_entity};
use super::Datastore;

pub const CURATOR_KIND: &str = "curatorentity";
pub const CURATOR_ID_PATH: &str = "CuratorId";

/// A curator mark. Only `CuratorId` is ever queried.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CuratorEntity {
    pub curator_id: String,
    pub nickname: String,
    pub email: String,
}

impl Entity for CuratorEntity {
    const KIND: &'static str = CURATOR_KIND;
    const NOINDEX: &'static [&'static str] = &["Nickname", "Email"];
}

#[async_trait]
pub trait CuratorRegistry: Send + Sync {
    /// Number of curator marks registered for `creator_id`.
    async fn count_marks(&self, ctx: &RequestCtx, creator_id: &str) -> Result<usize, StoreError>;
}

/// Registry reader backed by the sibling `curatorentity` collection.
#[derive(Clone)]
pub struct DatastoreCuratorRegistry {
    store: Arc<dyn Datastore>,
}

impl DatastoreCuratorRegistry {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Write a mark under `mark_id`.
    pub async fn add_mark(
        &self,
        ctx: &RequestCtx,
        mark_id: &str,
        mark: &CuratorEntity,
    ) -> Result<EntityKey, StoreError> {
        let key = EntityKey::new(CURATOR_KIND, mark_id, None);
        put_entity(self.store.as_ref(), ctx, &key, mark).await
    }
}

#[async_trait]
impl CuratorRegistry for DatastoreCuratorRegistry {
    async fn count_marks(&self, ctx: &RequestCtx, creator_id: &str) -> Result<usize, StoreError> {
        let q = Query::new(CURATOR_KIND).filter(Filter::eq(CURATOR_ID_PATH, creator_id));
        count_entities(self.store.as_ref(), ctx, &q).await
    }
}
