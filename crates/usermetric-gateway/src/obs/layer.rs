//! Request tracking middleware.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};

use crate::app_state::AppState;

/// Attached to error responses so the tracking layer can label failures.
#[derive(Debug, Clone, Copy)]
pub struct ErrorTag {
    pub code: &'static str,
    pub store: Option<&'static str>,
}

/// Counts and times every request that matched a route.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".into());
    let method = req.method().as_str().to_owned();
    let started = Instant::now();

    let resp = next.run(req).await;

    let metrics = state.metrics();
    let status = resp.status().as_u16().to_string();
    metrics.http_requests.inc(&[("route", &route), ("method", &method), ("status", &status)]);
    metrics
        .request_duration
        .observe(&[("route", &route), ("method", &method)], started.elapsed());
    if let Some(tag) = resp.extensions().get::<ErrorTag>() {
        metrics.request_errors.inc(&[("route", &route), ("code", tag.code)]);
        if let Some(kind) = tag.store {
            metrics.store_errors.inc(&[("kind", kind)]);
        }
    }
    resp
}
