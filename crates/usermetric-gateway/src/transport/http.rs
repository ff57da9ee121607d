//! `/usermetric` handlers.
//!
//! Every handler opens a [`RequestCtx`](crate::context::RequestCtx) bounded by `server.request_timeout_ms`;
//! the paired guard lives as long as the handler future, so an aborted client
//! request cancels in-flight store calls.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;

use usermetric_core::error::UserMetricError;
use usermetric_core::model::{UserMetricApi, UserMetricHeaderOnlyApi};
use usermetric_core::StoreError;

use crate::app_state::AppState;
use crate::obs::ErrorTag;
use crate::transport::codec;

/// Client-visible error: plain-text body, status by error kind.
#[derive(Debug)]
pub struct HttpError(pub UserMetricError);

impl From<UserMetricError> for HttpError {
    fn from(e: UserMetricError) -> Self {
        Self(e)
    }
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            UserMetricError::BadInput(_) => StatusCode::BAD_REQUEST,
            UserMetricError::Conflict(_) => StatusCode::CONFLICT,
            UserMetricError::MalformedBody(_) => StatusCode::INTERNAL_SERVER_ERROR,
            UserMetricError::Backend(StoreError::OverQuota) => StatusCode::SERVICE_UNAVAILABLE,
            UserMetricError::Backend(StoreError::DeadlineExceeded) => StatusCode::REQUEST_TIMEOUT,
            UserMetricError::Backend(_) | UserMetricError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.0.client_code().as_str(), error = %self.0, "request failed");
        } else {
            tracing::debug!(code = self.0.client_code().as_str(), error = %self.0, "request rejected");
        }
        let tag = ErrorTag {
            code: self.0.client_code().as_str(),
            store: match &self.0 {
                UserMetricError::Backend(e) => Some(e.kind()),
                _ => None,
            },
        };
        let mut resp = (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.0.to_string(),
        )
            .into_response();
        resp.extensions_mut().insert(tag);
        resp
    }
}

#[derive(Debug, Deserialize)]
pub struct DateFromQuery {
    #[serde(rename = "dateFrom", default)]
    pub date_from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CurateQuery {
    #[serde(rename = "newStatus", default)]
    pub new_status: Option<String>,
}

/// POST /usermetric
#[tracing::instrument(name = "usermetric.insert", skip_all, fields(req = tracing::field::Empty))]
pub async fn insert_usermetric(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<String>), HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    let metric = codec::decode_usermetric(&body)?;
    let key = app.usermetrics().create(&ctx, metric).await?;
    Ok((StatusCode::CREATED, Json(key)))
}

/// PUT /usermetric
#[tracing::instrument(name = "usermetric.update", skip_all, fields(req = tracing::field::Empty))]
pub async fn update_usermetric(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    let metric = codec::decode_usermetric(&body)?;
    app.usermetrics().replace(&ctx, metric).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /usermetric?dateFrom=
#[tracing::instrument(name = "usermetric.list", skip_all, fields(req = tracing::field::Empty))]
pub async fn list_usermetric_headers(
    State(app): State<AppState>,
    Query(q): Query<DateFromQuery>,
) -> Result<Json<Vec<UserMetricHeaderOnlyApi>>, HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    let since = codec::parse_date_from(q.date_from.as_deref())?;
    let headers = app.usermetrics().list_headers_since(&ctx, since).await?;
    Ok(Json(headers))
}

/// GET /usermetric/count?dateFrom=
#[tracing::instrument(name = "usermetric.count", skip_all, fields(req = tracing::field::Empty))]
pub async fn count_usermetric_headers(
    State(app): State<AppState>,
    Query(q): Query<DateFromQuery>,
) -> Result<Json<usize>, HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    let since = codec::parse_date_from(q.date_from.as_deref())?;
    Ok(Json(app.usermetrics().count_headers_since(&ctx, since).await))
}

/// GET /usermetric/{key}
#[tracing::instrument(name = "usermetric.get", skip_all, fields(req = tracing::field::Empty, key = %key))]
pub async fn get_usermetric(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<UserMetricApi>, HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    let metric = app.usermetrics().fetch(&ctx, &key).await?;
    Ok(Json(metric))
}

/// DELETE /usermetric/{key} (soft-delete)
#[tracing::instrument(name = "usermetric.delete", skip_all, fields(req = tracing::field::Empty, key = %key))]
pub async fn delete_usermetric(
    State(app): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    app.usermetrics().soft_delete(&ctx, &key).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /usermetric/{key}/curate?newStatus=
#[tracing::instrument(name = "usermetric.curate", skip_all, fields(req = tracing::field::Empty, key = %key))]
pub async fn curate_usermetric(
    State(app): State<AppState>,
    Path(key): Path<String>,
    Query(q): Query<CurateQuery>,
) -> Result<StatusCode, HttpError> {
    let (ctx, _guard) = app.request_ctx();
    tracing::Span::current().record("req", ctx.id());

    let curated = codec::parse_bool("newStatus", q.new_status.as_deref())?;
    app.usermetrics().set_curated(&ctx, &key, curated).await?;
    Ok(StatusCode::NO_CONTENT)
}
