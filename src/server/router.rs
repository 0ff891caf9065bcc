use crate::bootstrap::Services;
use crate::server::guards::auth::RequireAdminKey;
use crate::server::routes::{admin, api, favorites, feed, notifications, pwas};

use axum::{
    Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::Response,
};
use base64::Engine as _;
use rand::RngCore;
use std::sync::Arc;
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct DirectoryState {
    pub services: Services,
    pub admin_key: Arc<str>,
    /// Channel title/link for the feed.
    pub site_title: Arc<str>,
    pub public_base: Arc<str>,
}

impl DirectoryState {
    pub fn new(services: Services, admin_key: Arc<str>, public_base: &str) -> Self {
        Self {
            services,
            admin_key,
            site_title: Arc::from("PWA Directory"),
            public_base: Arc::from(public_base.trim_end_matches('/')),
        }
    }
}

async fn not_found_handler() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn access_log(req: Request, next: Next) -> Response {
    // Capture request metadata before moving `req` into the handler stack.
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = start.elapsed().as_millis() as u64;
    let path = uri.path();
    let protocol = format_http_version(version);
    let cache = resp
        .headers()
        .get("x-cache")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {} | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            cache,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {} | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            cache,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {} | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            cache,
            user_agent
        );
    }

    resp
}

pub fn directory_router(state: DirectoryState) -> Router {
    let admin = admin::router().layer(middleware::from_extractor_with_state::<RequireAdminKey, _>(
        state.clone(),
    ));

    Router::new()
        .merge(pwas::router())
        .merge(api::router())
        .merge(feed::router())
        .merge(favorites::router())
        .merge(notifications::router())
        .merge(admin)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(CompressionLayer::new())
        .layer(middleware::from_fn(access_log))
}
