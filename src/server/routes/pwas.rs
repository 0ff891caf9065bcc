use crate::error::DirectoryError;
use crate::pwa::ListQuery;
use crate::pwa::view::{PwaDetail, PwaListPage, SubmissionView};
use crate::server::cache::{json_page, serve_cached};
use crate::server::guards::user::RequireUser;
use crate::server::router::DirectoryState;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use pwadir_pagecache::{LIST_TAG, pwa_tag};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub fn router() -> Router<DirectoryState> {
    Router::new()
        .route("/", get(list_page))
        .route("/pwas", get(list_page).post(submit))
        .route("/pwas/{id}", get(detail_page))
        .route("/pwas/{id}/lighthouse", get(lighthouse_history))
        .route("/pwas/{id}/lighthouse/latest", get(lighthouse_latest))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(alias = "manifestUrl")]
    pub manifest_url: String,
}

#[derive(Debug, Serialize)]
struct LighthouseReportView {
    id: i64,
    pwa_id: i64,
    score: i64,
    created_at: DateTime<Utc>,
    report: Value,
}

/// GET / and GET /pwas
pub(super) async fn list_page(
    State(state): State<DirectoryState>,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, DirectoryError> {
    let Query(query) = query?;
    let service = state.services.pwa.clone();

    serve_cached(&state.services.cache, &uri, &headers, || async move {
        let resolved = query.resolve(service.listing());
        let page = service.list(&query).await?;
        let view = PwaListPage::new(&page, resolved.sort, resolved.offset, resolved.limit);
        json_page(&view, vec![LIST_TAG.to_string()])
    })
    .await
}

/// GET /pwas/{id}
pub(super) async fn detail_page(
    State(state): State<DirectoryState>,
    uri: Uri,
    headers: HeaderMap,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, DirectoryError> {
    let Path(id) = id?;
    let service = state.services.pwa.clone();

    serve_cached(&state.services.cache, &uri, &headers, || async move {
        let pwa = service.get_visible(id).await?;
        let latest = service.reports(id).await?.into_iter().next();
        json_page(&PwaDetail::new(&pwa, latest), vec![pwa_tag(id)])
    })
    .await
}

/// POST /pwas
///
/// 201 for a newly listed PWA, 200 when an existing listing was refreshed.
pub(super) async fn submit(
    State(state): State<DirectoryState>,
    RequireUser(user): RequireUser,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Response, DirectoryError> {
    let Json(req) = payload?;
    let submission = state.services.pwa.submit(&req.manifest_url, &user).await?;

    let status = if submission.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let view = SubmissionView {
        pwa: (&submission.pwa).into(),
        created: submission.created,
        warnings: submission.warnings,
    };
    Ok((status, Json(view)).into_response())
}

/// GET /pwas/{id}/lighthouse
pub(super) async fn lighthouse_history(
    State(state): State<DirectoryState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, DirectoryError> {
    let Path(id) = id?;
    let reports = state.services.pwa.reports(id).await?;
    Ok(Json(reports).into_response())
}

/// GET /pwas/{id}/lighthouse/latest
pub(super) async fn lighthouse_latest(
    State(state): State<DirectoryState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, DirectoryError> {
    let Path(id) = id?;
    let report = state.services.pwa.latest_report(id).await?;
    let view = LighthouseReportView {
        id: report.id,
        pwa_id: report.pwa_id,
        score: report.score,
        created_at: report.created_at,
        report: serde_json::from_str(&report.report_json)?,
    };
    Ok(Json(view).into_response())
}
