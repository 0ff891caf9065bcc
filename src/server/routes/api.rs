use crate::db::PwaSort;
use crate::error::DirectoryError;
use crate::pwa::ListQuery;
use crate::pwa::export::{CSV_CONTENT_TYPE, to_csv};
use crate::pwa::view::{PwaDetail, PwaListPage, PwaSummary, SearchHitView};
use crate::search::DEFAULT_SEARCH_LIMIT;
use crate::server::cache::{json_page, serve_cached};
use crate::server::router::DirectoryState;
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::{HeaderMap, Uri},
    response::{IntoResponse, Response},
    routing::get,
};
use pwadir_pagecache::{CachedPage, LIST_TAG, pwa_tag};
use serde::Deserialize;

pub fn router() -> Router<DirectoryState> {
    Router::new()
        .route("/api/pwa", get(list))
        .route("/api/pwa/{id}", get(detail))
        .route("/api/search", get(search))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiListQuery {
    #[serde(default)]
    pub sort: PwaSort,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub format: ExportFormat,
}

impl ApiListQuery {
    fn listing(&self) -> ListQuery {
        ListQuery {
            sort: self.sort,
            start: self.start,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default, alias = "q")]
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/pwa
pub(super) async fn list(
    State(state): State<DirectoryState>,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<ApiListQuery>, QueryRejection>,
) -> Result<Response, DirectoryError> {
    let Query(query) = query?;
    let service = state.services.pwa.clone();

    serve_cached(&state.services.cache, &uri, &headers, || async move {
        let listing = query.listing();
        let page = service.list(&listing).await?;
        let tags = vec![LIST_TAG.to_string()];

        match query.format {
            ExportFormat::Csv => Ok(CachedPage::new(to_csv(&page.items)?, CSV_CONTENT_TYPE, tags)),
            ExportFormat::Json => {
                let resolved = listing.resolve(service.listing());
                let view =
                    PwaListPage::new(&page, resolved.sort, resolved.offset, resolved.limit);
                json_page(&view, tags)
            }
        }
    })
    .await
}

/// GET /api/pwa/{id}
pub(super) async fn detail(
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

/// GET /api/search?query=...
///
/// Not cached: the index keeps itself fresh and queries are cheap.
pub(super) async fn search(
    State(state): State<DirectoryState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Response, DirectoryError> {
    let Query(query) = query?;
    let text = query.query.trim();
    if text.is_empty() {
        return Err(DirectoryError::InvalidRequest(
            "query must not be empty".to_string(),
        ));
    }

    let hits = state
        .services
        .search
        .search(text, query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT))
        .await?;

    let views: Vec<SearchHitView> = hits
        .iter()
        .map(|hit| SearchHitView {
            pwa: PwaSummary::from(hit.pwa.as_ref()),
            score: hit.score,
        })
        .collect();
    Ok(Json(views).into_response())
}
