//! Axum router wiring.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{app_state::AppState, obs, ops, transport::http};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .route(
            "/usermetric",
            post(http::insert_usermetric)
                .put(http::update_usermetric)
                .get(http::list_usermetric_headers),
        )
        .route("/usermetric/count", get(http::count_usermetric_headers))
        .route(
            "/usermetric/:key",
            get(http::get_usermetric).delete(http::delete_usermetric),
        )
        .route("/usermetric/:key/curate", put(http::curate_usermetric))
        .route_layer(middleware::from_fn_with_state(state.clone(), obs::track_requests))
        .with_state(state)
}
