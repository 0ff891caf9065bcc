use crate::error::DirectoryError;
use crate::pwa::export::{FeedChannel, RSS_CONTENT_TYPE, to_rss};
use crate::server::cache::serve_cached;
use crate::server::router::DirectoryState;
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, Uri},
    response::Response,
    routing::get,
};
use pwadir_pagecache::{CachedPage, LIST_TAG};

pub fn router() -> Router<DirectoryState> {
    Router::new().route("/feed", get(feed))
}

/// GET /feed
pub(super) async fn feed(
    State(state): State<DirectoryState>,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, DirectoryError> {
    let service = state.services.pwa.clone();
    let title = state.site_title.clone();
    let link = state.public_base.clone();

    serve_cached(&state.services.cache, &uri, &headers, || async move {
        let pwas = service.feed().await?;
        let channel = FeedChannel {
            title: &title,
            link: &link,
            description: "Recently added Progressive Web Apps",
        };
        Ok(CachedPage::new(
            to_rss(&channel, &pwas)?,
            RSS_CONTENT_TYPE,
            vec![LIST_TAG.to_string()],
        ))
    })
    .await
}
