use std::sync::Arc;

use chrono::{DateTime, Utc};

use usermetric_core::error::{ReadError, Result, TolerateDrift, UserMetricError};
use usermetric_core::key::{usermetric_key, usermetric_root_key, KeyUse, USERMETRIC_KIND};
use usermetric_core::model::entity::LAST_CHANGED_PATH;
use usermetric_core::model::{UserMetricApi, UserMetricEntity, UserMetricEntityHeaderOnly, UserMetricHeaderOnlyApi};
use usermetric_core::StoreError;

use crate::context::RequestCtx;
use crate::store::typed::{count_entities, get_entity, put_entity, query_entities};
use crate::store::{CuratorRegistry, Datastore, Filter, Order, Query};

use super::clock::Clock;

/// Upper bound of one listing page. The desktop client pages with the same
/// number; changing it on one side only makes the client miss records.
pub const MAX_HEADERS_PER_CALL: usize = 200;

/// Lifecycle controller for user metric records.
///
/// Not transactional: the duplicate check in `create` and its write can race
/// with a concurrent create of the same key.
#[derive(Clone)]
pub struct UserMetricService {
    store: Arc<dyn Datastore>,
    curators: Arc<dyn CuratorRegistry>,
    clock: Arc<dyn Clock>,
}

impl UserMetricService {
    pub fn new(store: Arc<dyn Datastore>, curators: Arc<dyn CuratorRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { store, curators, clock }
    }

    /// Insert a new record. Fails with `Conflict` if the key is taken.
    ///
    /// `Curated` is derived from the curator registry: exactly one mark for the
    /// creator means curated. Registry errors leave the record uncurated.
    pub async fn create(&self, ctx: &RequestCtx, metric: UserMetricApi) -> Result<String> {
        let key = usermetric_key(&metric.header.key, KeyUse::Insert)?;

        match get_entity::<UserMetricEntity>(self.store.as_ref(), ctx, &key).await {
            Ok(_) | Err(ReadError::FieldMismatch { .. }) => {
                return Err(UserMetricError::Conflict(format!(
                    "usermetric with key {:?} already exists",
                    key.string_id()
                )));
            }
            Err(ReadError::Store(StoreError::NoSuchEntity)) => {}
            Err(ReadError::Store(e)) => return Err(e.into()),
        }

        let mut entity = UserMetricEntity::from(metric);
        entity.header.last_changed = self.clock.now();
        entity.header.deleted = false;
        entity.header.curated = match self.curators.count_marks(ctx, &entity.header.creator_id).await {
            Ok(n) => n == 1,
            Err(e) => {
                tracing::warn!(creator = %entity.header.creator_id, error = %e, "curator lookup failed, leaving uncurated");
                false
            }
        };

        let stored = put_entity(self.store.as_ref(), ctx, &key, &entity).await?;
        tracing::info!(key = %stored.string_id(), curated = entity.header.curated, "usermetric created");
        Ok(stored.string_id().to_string())
    }

    /// Blind full overwrite. No existence check; `Curated`/`Deleted` are taken
    /// as supplied.
    pub async fn replace(&self, ctx: &RequestCtx, metric: UserMetricApi) -> Result<()> {
        let key = usermetric_key(&metric.header.key, KeyUse::Update)?;

        let mut entity = UserMetricEntity::from(metric);
        entity.header.last_changed = self.clock.now();

        put_entity(self.store.as_ref(), ctx, &key, &entity).await?;
        tracing::info!(key = %key.string_id(), "usermetric replaced");
        Ok(())
    }

    /// Full record by key. A missing key surfaces as a backend error.
    pub async fn fetch(&self, ctx: &RequestCtx, user_key: &str) -> Result<UserMetricApi> {
        let key = usermetric_key(user_key, KeyUse::Update)?;
        let entity = get_entity::<UserMetricEntity>(self.store.as_ref(), ctx, &key)
            .await
            .tolerate_drift()?;
        Ok(entity.into_api(&key))
    }

    /// Headers changed at or after `since`, oldest first, at most
    /// [`MAX_HEADERS_PER_CALL`].
    pub async fn list_headers_since(
        &self,
        ctx: &RequestCtx,
        since: DateTime<Utc>,
    ) -> Result<Vec<UserMetricHeaderOnlyApi>> {
        let q = Query::new(USERMETRIC_KIND)
            .ancestor(usermetric_root_key())
            .filter(Filter::since(LAST_CHANGED_PATH, since))
            .order(Order::asc(LAST_CHANGED_PATH))
            .limit(MAX_HEADERS_PER_CALL);

        let rows = query_entities::<UserMetricEntityHeaderOnly>(self.store.as_ref(), ctx, &q)
            .await
            .tolerate_drift()?;

        Ok(rows.into_iter().map(|(key, h)| h.into_api(&key)).collect())
    }

    /// Number of records changed at or after `since`. Store errors are logged
    /// and reported as 0.
    pub async fn count_headers_since(&self, ctx: &RequestCtx, since: DateTime<Utc>) -> usize {
        let q = Query::new(USERMETRIC_KIND)
            .ancestor(usermetric_root_key())
            .filter(Filter::since(LAST_CHANGED_PATH, since))
            .order(Order::desc(LAST_CHANGED_PATH));

        match count_entities(self.store.as_ref(), ctx, &q).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "usermetric count failed, reporting 0");
                0
            }
        }
    }

    /// Tombstone the record and erase its payload in one write.
    pub async fn soft_delete(&self, ctx: &RequestCtx, user_key: &str) -> Result<()> {
        let key = usermetric_key(user_key, KeyUse::Update)?;
        let mut entity = get_entity::<UserMetricEntity>(self.store.as_ref(), ctx, &key)
            .await
            .tolerate_drift()?;

        entity.mark_deleted(self.clock.now());

        put_entity(self.store.as_ref(), ctx, &key, &entity).await?;
        tracing::info!(key = %key.string_id(), "usermetric soft-deleted");
        Ok(())
    }

    /// Set the curated flag; nothing else but `LastChanged` changes.
    pub async fn set_curated(&self, ctx: &RequestCtx, user_key: &str, curated: bool) -> Result<()> {
        let key = usermetric_key(user_key, KeyUse::Update)?;
        let mut entity = get_entity::<UserMetricEntity>(self.store.as_ref(), ctx, &key)
            .await
            .tolerate_drift()?;

        entity.set_curated(curated, self.clock.now());

        put_entity(self.store.as_ref(), ctx, &key, &entity).await?;
        tracing::info!(key = %key.string_id(), curated, "usermetric curation changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    use super::*;
    use usermetric_core::error::ClientCode;
    use usermetric_core::model::CommonApiHeader;

    use crate::store::curator::CuratorEntity;
    use crate::store::{DatastoreCuratorRegistry, Document, MemoryDatastore};

    /// Advances one second per reading.
    struct StepClock(Mutex<DateTime<Utc>>);

    impl StepClock {
        fn starting_at(t: DateTime<Utc>) -> Self {
            Self(Mutex::new(t))
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            let mut t = self.0.lock().unwrap();
            *t += Duration::seconds(1);
            *t
        }
    }

    struct BrokenRegistry;

    #[async_trait]
    impl CuratorRegistry for BrokenRegistry {
        async fn count_marks(&self, _ctx: &RequestCtx, _creator_id: &str) -> std::result::Result<usize, StoreError> {
            Err(StoreError::Backend("registry unavailable".into()))
        }
    }

    struct Fixture {
        store: Arc<MemoryDatastore>,
        registry: DatastoreCuratorRegistry,
        svc: UserMetricService,
        ctx: RequestCtx,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryDatastore::new());
        let registry = DatastoreCuratorRegistry::new(store.clone());
        let svc = UserMetricService::new(
            store.clone(),
            Arc::new(registry.clone()),
            Arc::new(StepClock::starting_at(t0())),
        );
        Fixture { store, registry, svc, ctx: RequestCtx::background() }
    }

    fn metric(key: &str, creator: &str) -> UserMetricApi {
        UserMetricApi {
            header: CommonApiHeader {
                key: key.into(),
                name: format!("metric {key}"),
                creator_id: creator.into(),
                ..Default::default()
            },
            metric_xml: "<x/>".into(),
            creator_nick: "nick".into(),
            creator_email: "nick@example.org".into(),
        }
    }

    async fn mark_curator(f: &Fixture, mark_id: &str, creator: &str) {
        let mark = CuratorEntity { curator_id: creator.into(), ..Default::default() };
        f.registry.add_mark(&f.ctx, mark_id, &mark).await.unwrap();
    }

    #[tokio::test]
    async fn create_rejects_empty_key() {
        let f = fixture();
        let err = f.svc.create(&f.ctx, metric("", "c1")).await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::BadInput);
        assert_eq!(err.to_string(), "Mandatory Key for Insert is missing or invalid");
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn create_without_curator_mark_is_uncurated() {
        let f = fixture();
        let key = f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        assert_eq!(key, "m1");

        let got = f.svc.fetch(&f.ctx, "m1").await.unwrap();
        assert!(!got.header.curated);
        assert!(!got.header.deleted);
        assert_eq!(got.header.key, "m1");
        assert_eq!(got.header.last_changed, t0() + Duration::seconds(1));
        assert_eq!(got.metric_xml, "<x/>");
    }

    #[tokio::test]
    async fn create_by_single_curator_is_curated() {
        let f = fixture();
        mark_curator(&f, "k1", "c1").await;
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        assert!(f.svc.fetch(&f.ctx, "m1").await.unwrap().header.curated);
    }

    #[tokio::test]
    async fn duplicate_curator_marks_do_not_curate() {
        let f = fixture();
        mark_curator(&f, "k1", "c1").await;
        mark_curator(&f, "k2", "c1").await;
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        assert!(!f.svc.fetch(&f.ctx, "m1").await.unwrap().header.curated);
    }

    #[tokio::test]
    async fn create_ignores_client_flags() {
        let f = fixture();
        let mut m = metric("m1", "c1");
        m.header.curated = true;
        m.header.deleted = true;
        f.svc.create(&f.ctx, m).await.unwrap();
        let got = f.svc.fetch(&f.ctx, "m1").await.unwrap();
        assert!(!got.header.curated);
        assert!(!got.header.deleted);
    }

    #[tokio::test]
    async fn registry_failure_leaves_uncurated() {
        let store = Arc::new(MemoryDatastore::new());
        let svc = UserMetricService::new(
            store.clone(),
            Arc::new(BrokenRegistry),
            Arc::new(StepClock::starting_at(t0())),
        );
        let ctx = RequestCtx::background();
        svc.create(&ctx, metric("m1", "c1")).await.unwrap();
        assert!(!svc.fetch(&ctx, "m1").await.unwrap().header.curated);
    }

    #[tokio::test]
    async fn second_create_conflicts() {
        let f = fixture();
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        let err = f.svc.create(&f.ctx, metric("m1", "c2")).await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::Conflict);
        assert_eq!(f.svc.fetch(&f.ctx, "m1").await.unwrap().header.creator_id, "c1");
    }

    #[tokio::test]
    async fn create_over_drifted_record_conflicts() {
        let f = fixture();
        let key = usermetric_key("old", KeyUse::Insert).unwrap();
        let mut doc = Document::default();
        doc.properties.insert("Header".into(), json!({ "Name": "x", "Retired": true }));
        f.store.insert_raw(key, doc);

        let err = f.svc.create(&f.ctx, metric("old", "c1")).await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::Conflict);
    }

    #[tokio::test]
    async fn listing_is_ordered_by_last_changed() {
        let f = fixture();
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        f.svc.create(&f.ctx, metric("m2", "c1")).await.unwrap();

        let t_m1 = f.svc.fetch(&f.ctx, "m1").await.unwrap().header.last_changed;
        let list = f.svc.list_headers_since(&f.ctx, t_m1).await.unwrap();
        let keys: Vec<&str> = list.iter().map(|h| h.header.key.as_str()).collect();
        assert_eq!(keys, vec!["m1", "m2"]);

        // touching m1 moves it behind m2
        f.svc.set_curated(&f.ctx, "m1", true).await.unwrap();
        let list = f.svc.list_headers_since(&f.ctx, t_m1).await.unwrap();
        let keys: Vec<&str> = list.iter().map(|h| h.header.key.as_str()).collect();
        assert_eq!(keys, vec!["m2", "m1"]);

        let later = f.svc.fetch(&f.ctx, "m2").await.unwrap().header.last_changed + Duration::seconds(1);
        let list = f.svc.list_headers_since(&f.ctx, later).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].header.key, "m1");
    }

    #[tokio::test]
    async fn soft_delete_erases_payload() {
        let f = fixture();
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        let created = f.svc.fetch(&f.ctx, "m1").await.unwrap().header.last_changed;

        f.svc.soft_delete(&f.ctx, "m1").await.unwrap();
        let got = f.svc.fetch(&f.ctx, "m1").await.unwrap();
        assert!(got.header.deleted);
        assert_eq!(got.metric_xml, "");
        assert_eq!(got.creator_nick, "nick");
        assert!(got.header.last_changed > created);

        // tombstones stay listable
        let list = f.svc.list_headers_since(&f.ctx, created).await.unwrap();
        assert!(list[0].header.deleted);
    }

    #[tokio::test]
    async fn soft_delete_of_missing_key_is_backend_error() {
        let f = fixture();
        let err = f.svc.soft_delete(&f.ctx, "ghost").await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::Backend);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn set_curated_keeps_payload_and_advances_clock() {
        let f = fixture();
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        let before = f.svc.fetch(&f.ctx, "m1").await.unwrap();

        f.svc.set_curated(&f.ctx, "m1", true).await.unwrap();
        let after = f.svc.fetch(&f.ctx, "m1").await.unwrap();
        assert!(after.header.curated);
        assert!(!after.header.deleted);
        assert_eq!(after.metric_xml, before.metric_xml);
        assert!(after.header.last_changed > before.header.last_changed);

        f.svc.set_curated(&f.ctx, "m1", false).await.unwrap();
        assert!(!f.svc.fetch(&f.ctx, "m1").await.unwrap().header.curated);
    }

    #[tokio::test]
    async fn replace_is_blind_and_unsanitized() {
        let f = fixture();
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        f.svc.soft_delete(&f.ctx, "m1").await.unwrap();

        let mut m = metric("m1", "c1");
        m.header.curated = true;
        m.header.deleted = false;
        m.metric_xml = "<y/>".into();
        f.svc.replace(&f.ctx, m).await.unwrap();

        let got = f.svc.fetch(&f.ctx, "m1").await.unwrap();
        assert!(got.header.curated);
        assert!(!got.header.deleted);
        assert_eq!(got.metric_xml, "<y/>");

        // no existence check either
        f.svc.replace(&f.ctx, metric("fresh", "c9")).await.unwrap();
        assert_eq!(f.svc.fetch(&f.ctx, "fresh").await.unwrap().header.creator_id, "c9");

        let err = f.svc.replace(&f.ctx, metric("", "c1")).await.unwrap_err();
        assert_eq!(err.to_string(), "Mandatory Key for Update is missing or invalid");
    }

    #[tokio::test]
    async fn fetch_of_missing_key_is_backend_error() {
        let f = fixture();
        let err = f.svc.fetch(&f.ctx, "ghost").await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::Backend);
    }

    #[tokio::test]
    async fn fetch_tolerates_drift() {
        let f = fixture();
        let key = usermetric_key("old", KeyUse::Update).unwrap();
        let mut doc = Document::default();
        doc.properties.insert("Header".into(), json!({ "Name": "legacy", "Retired": true }));
        doc.properties.insert("MetricXML".into(), json!("<old/>"));
        doc.properties.insert("Formula".into(), json!("a+b"));
        f.store.insert_raw(key, doc);

        let got = f.svc.fetch(&f.ctx, "old").await.unwrap();
        assert_eq!(got.header.key, "old");
        assert_eq!(got.header.name, "legacy");
        assert_eq!(got.metric_xml, "<old/>");
    }

    fn plant_drifted(f: &Fixture, user_key: &str) {
        let key = usermetric_key(user_key, KeyUse::Update).unwrap();
        let mut doc = Document::default();
        doc.properties.insert("Header".into(), json!({ "Name": "legacy", "CreatorId": "c1", "Retired": true }));
        doc.properties.insert("MetricXML".into(), json!("<old/>"));
        doc.properties.insert("CreatorNick".into(), json!("ann"));
        doc.properties.insert("Formula".into(), json!("a+b"));
        f.store.insert_raw(key, doc);
    }

    #[tokio::test]
    async fn soft_delete_tolerates_drift() {
        let f = fixture();
        plant_drifted(&f, "old");

        f.svc.soft_delete(&f.ctx, "old").await.unwrap();

        let got = f.svc.fetch(&f.ctx, "old").await.unwrap();
        assert!(got.header.deleted);
        assert_eq!(got.metric_xml, "");
        assert_eq!(got.header.name, "legacy");
        assert_eq!(got.header.creator_id, "c1");
        assert_eq!(got.creator_nick, "ann");
        assert_eq!(got.header.last_changed, t0() + Duration::seconds(1));
    }

    #[tokio::test]
    async fn set_curated_tolerates_drift() {
        let f = fixture();
        plant_drifted(&f, "old");

        f.svc.set_curated(&f.ctx, "old", true).await.unwrap();

        let got = f.svc.fetch(&f.ctx, "old").await.unwrap();
        assert!(got.header.curated);
        assert!(!got.header.deleted);
        assert_eq!(got.metric_xml, "<old/>");
        assert_eq!(got.header.name, "legacy");
        assert_eq!(got.creator_nick, "ann");
    }

    #[tokio::test]
    async fn set_curated_of_missing_key_is_backend_error() {
        let f = fixture();
        let err = f.svc.set_curated(&f.ctx, "ghost", true).await.unwrap_err();
        assert_eq!(err.client_code(), ClientCode::Backend);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn listing_caps_at_page_size_but_count_does_not() {
        let f = fixture();
        for i in 0..250 {
            f.svc.create(&f.ctx, metric(&format!("m{i:03}"), "c1")).await.unwrap();
        }
        let since = DateTime::<Utc>::default();
        let list = f.svc.list_headers_since(&f.ctx, since).await.unwrap();
        assert_eq!(list.len(), MAX_HEADERS_PER_CALL);
        assert!(list.windows(2).all(|w| w[0].header.last_changed <= w[1].header.last_changed));
        assert_eq!(list[0].header.key, "m000");
        assert_eq!(f.svc.count_headers_since(&f.ctx, since).await, 250);
    }

    #[tokio::test]
    async fn count_swallows_store_errors() {
        let f = fixture();
        f.svc.create(&f.ctx, metric("m1", "c1")).await.unwrap();
        let (ctx, guard) = RequestCtx::new(None);
        drop(guard);
        assert_eq!(f.svc.count_headers_since(&ctx, DateTime::<Utc>::default()).await, 0);
    }

    #[tokio::test]
    async fn curator_marks_are_not_listed() {
        let f = fixture();
        mark_curator(&f, "k1", "c1").await;
        let list = f.svc.list_headers_since(&f.ctx, DateTime::<Utc>::default()).await.unwrap();
        assert!(list.is_empty());
        assert_eq!(f.svc.count_headers_since(&f.ctx, DateTime::<Utc>::default()).await, 0);
    }
}
