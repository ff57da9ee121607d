//! Shared application state.
//!
//! Builds the store backend, seeds the curator registry from config and wires
//! the lifecycle controller. Startup errors are returned, not panicked.

use std::sync::Arc;

use usermetric_core::error::Result;

use crate::config::{GatewayConfig, StoreBackend};
use crate::context::{CancelGuard, RequestCtx};
use crate::lifecycle::{SystemClock, UserMetricService};
use crate::obs::GatewayMetrics;
use crate::store::curator::CuratorEntity;
use crate::store::{Datastore, DatastoreCuratorRegistry, MemoryDatastore};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: GatewayConfig,
    usermetrics: UserMetricService,
    metrics: GatewayMetrics,
}

impl AppState {
    pub async fn new(cfg: GatewayConfig) -> Result<Self> {
        let store: Arc<dyn Datastore> = match cfg.store.backend {
            StoreBackend::Memory => Arc::new(MemoryDatastore::new()),
        };

        let registry = DatastoreCuratorRegistry::new(Arc::clone(&store));
        let ctx = RequestCtx::background();
        for id in &cfg.store.curators {
            let mark = CuratorEntity {
                curator_id: id.clone(),
                ..Default::default()
            };
            registry.add_mark(&ctx, id, &mark).await?;
            tracing::info!(curator = %id, "curator registered");
        }

        let usermetrics = UserMetricService::new(store, Arc::new(registry), Arc::new(SystemClock));
        Ok(Self::with_service(cfg, usermetrics))
    }

    /// State around an already wired controller (custom store, clock or registry).
    pub fn with_service(cfg: GatewayConfig, usermetrics: UserMetricService) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                usermetrics,
                metrics: GatewayMetrics::default(),
            }),
        }
    }

    pub fn cfg(&self) -> &GatewayConfig {
        &self.inner.cfg
    }

    pub fn usermetrics(&self) -> &UserMetricService {
        &self.inner.usermetrics
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.inner.metrics
    }

    /// Set once shutdown starts; `/readyz` reports 503 from then on.
    pub fn set_draining(&self) {
        self.inner.metrics.set_draining();
    }

    pub fn is_draining(&self) -> bool {
        self.inner.metrics.is_draining()
    }

    /// Fresh per-request context bounded by the configured timeout.
    pub fn request_ctx(&self) -> (RequestCtx, CancelGuard) {
        RequestCtx::new(Some(self.cfg().server.request_timeout()))
    }
}
