//! Serving responses through the page cache.

use crate::error::DirectoryError;
use axum::{
    body::{Body, Bytes},
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode, Uri,
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
    response::{IntoResponse, Response},
};
use pwadir_pagecache::{CachedPage, PageCache, PageKeyGenerator};
use serde::Serialize;
use std::future::Future;

pub const JSON_CONTENT_TYPE: &str = "application/json";

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Answers from the cache when possible, otherwise renders, stores and answers.
///
/// `render` only runs on a miss; errors are returned as-is and never cached.
/// A page rendered while an invalidation ran is answered but not stored.
pub async fn serve_cached<F, Fut>(
    cache: &PageCache,
    uri: &Uri,
    headers: &HeaderMap,
    render: F,
) -> Result<Response, DirectoryError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<CachedPage, DirectoryError>>,
{
    let key = PageKeyGenerator::for_request(uri.path(), uri.query());

    let (page, hit) = match cache.get(&key) {
        Some(page) => (page, true),
        None => {
            let generation = cache.generation();
            let page = render().await?;
            cache.put_if_current(key, page.clone(), generation);
            (page, false)
        }
    };

    Ok(respond(&page, hit, headers, cache.ttl().as_secs()))
}

/// Serializes `value` into a cacheable JSON page.
pub fn json_page<T: Serialize>(value: &T, tags: Vec<String>) -> Result<CachedPage, DirectoryError> {
    Ok(CachedPage::new(
        serde_json::to_vec(value)?,
        JSON_CONTENT_TYPE,
        tags,
    ))
}

fn respond(page: &CachedPage, hit: bool, request_headers: &HeaderMap, max_age: u64) -> Response {
    let not_modified = request_headers
        .get(IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| etag_matches(v, &page.etag));

    let mut resp = if not_modified {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        let mut resp = Response::new(Body::from(Bytes::copy_from_slice(&page.body)));
        resp.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(page.content_type));
        resp
    };

    let headers = resp.headers_mut();
    if let Ok(etag) = HeaderValue::from_str(&page.etag) {
        headers.insert(ETAG, etag);
    }
    if let Ok(cc) = HeaderValue::from_str(&format!("public, max-age={max_age}")) {
        headers.insert(CACHE_CONTROL, cc);
    }
    headers.insert(
        X_CACHE,
        HeaderValue::from_static(if hit { "HIT" } else { "MISS" }),
    );
    resp
}

/// `If-None-Match` comparison: weak and strong tags compare equal, `*` matches anything.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}
