#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response},
};
use pwadir::bootstrap::{Backends, Services};
use pwadir::config::Config;
use pwadir::error::DirectoryError;
use pwadir::fetch::{FetchedManifest, ManifestFetcher};
use pwadir::identity::{IdentityVerifier, User};
use pwadir::lighthouse::{LighthouseOutcome, LighthouseRunner};
use pwadir::notifications::{Notification, PushProvider};
use pwadir::server::router::{DirectoryState, directory_router};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;
use url::Url;

pub const ADMIN_KEY: &str = "admin-secret";
pub const USER_TOKEN: &str = "token-alice";

pub fn temp_database_url(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "pwadir-{tag}-{}-{nanos}.sqlite",
        std::process::id()
    ));
    format!("sqlite:{}", path.display())
}

pub fn manifest_body(name: &str) -> String {
    json!({
        "name": name,
        "short_name": name,
        "description": format!("{name} forecasts for everyone"),
        "start_url": "/?source=pwa",
        "display": "standalone",
        "theme_color": "#0044aa",
        "icons": [
            { "src": "/icons/icon-192.png", "sizes": "192x192", "type": "image/png" },
            { "src": "/icons/icon-512.png", "sizes": "512x512", "type": "image/png" }
        ]
    })
    .to_string()
}

/// Serves manifests from memory; unknown URLs answer 404.
#[derive(Default)]
pub struct StubFetcher {
    pub bodies: Mutex<HashMap<String, String>>,
    /// URLs answering with a body over the size cap.
    pub oversize: Mutex<HashSet<String>>,
    pub fetches: AtomicUsize,
}

impl StubFetcher {
    pub fn set(&self, url: &str, body: String) {
        self.bodies
            .lock()
            .expect("fetcher lock")
            .insert(url.to_string(), body);
    }

    pub fn remove(&self, url: &str) {
        self.bodies.lock().expect("fetcher lock").remove(url);
        self.oversize.lock().expect("fetcher lock").remove(url);
    }

    pub fn set_oversize(&self, url: &str) {
        self.oversize
            .lock()
            .expect("fetcher lock")
            .insert(url.to_string());
    }
}

#[async_trait]
impl ManifestFetcher for StubFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedManifest, DirectoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self
            .oversize
            .lock()
            .expect("fetcher lock")
            .contains(url.as_str())
        {
            return Err(DirectoryError::ManifestTooLarge { limit: 64 * 1024 });
        }
        let body = self
            .bodies
            .lock()
            .expect("fetcher lock")
            .get(url.as_str())
            .cloned();
        match body {
            Some(body) => Ok(FetchedManifest {
                url: url.clone(),
                body,
            }),
            None => Err(DirectoryError::ManifestUnavailable(
                axum::http::StatusCode::NOT_FOUND,
            )),
        }
    }
}

pub struct StubLighthouse {
    pub score: i64,
}

#[async_trait]
impl LighthouseRunner for StubLighthouse {
    async fn run(&self, start_url: &Url) -> Result<LighthouseOutcome, DirectoryError> {
        Ok(LighthouseOutcome {
            score: self.score,
            report: json!({ "finalUrl": start_url.as_str(), "categories": { "pwa": { "score": self.score as f64 / 100.0 } } }),
        })
    }
}

/// Records every call as `"op:topic"`.
#[derive(Default)]
pub struct StubPush {
    pub calls: Mutex<Vec<String>>,
    pub published: Mutex<Vec<Notification>>,
}

impl StubPush {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("push lock").clone()
    }
}

#[async_trait]
impl PushProvider for StubPush {
    async fn subscribe(&self, _token: &str, topic: &str) -> Result<(), DirectoryError> {
        self.calls
            .lock()
            .expect("push lock")
            .push(format!("subscribe:{topic}"));
        Ok(())
    }

    async fn unsubscribe(&self, _token: &str, topic: &str) -> Result<(), DirectoryError> {
        self.calls
            .lock()
            .expect("push lock")
            .push(format!("unsubscribe:{topic}"));
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        notification: &Notification,
    ) -> Result<(), DirectoryError> {
        self.calls
            .lock()
            .expect("push lock")
            .push(format!("publish:{topic}"));
        self.published
            .lock()
            .expect("push lock")
            .push(notification.clone());
        Ok(())
    }
}

/// Accepts `token-<name>` and signs in as user `<name>`.
pub struct StubIdentity;

#[async_trait]
impl IdentityVerifier for StubIdentity {
    async fn verify(&self, id_token: &str) -> Result<User, DirectoryError> {
        match id_token.strip_prefix("token-") {
            Some(name) if !name.is_empty() => Ok(User {
                id: name.to_string(),
                email: Some(format!("{name}@example.com")),
                name: Some(name.to_string()),
            }),
            _ => Err(DirectoryError::Unauthorized("invalid ID token".to_string())),
        }
    }
}

pub struct TestApp {
    pub app: Router,
    pub services: Services,
    pub fetcher: Arc<StubFetcher>,
    pub push: Arc<StubPush>,
    pub cfg: Config,
}

pub async fn spawn_app(tag: &str) -> TestApp {
    let db = pwadir::db::spawn(&temp_database_url(tag)).await;

    let mut cfg = Config::default();
    cfg.basic.admin_key = ADMIN_KEY.to_string();

    let fetcher = Arc::new(StubFetcher::default());
    let push = Arc::new(StubPush::default());
    let backends = Backends {
        fetcher: fetcher.clone(),
        lighthouse: Arc::new(StubLighthouse { score: 87 }),
        push: push.clone(),
        identity: Arc::new(StubIdentity),
    };

    let services = Services::new(db, backends, &cfg);
    let state = DirectoryState::new(
        services.clone(),
        Arc::from(ADMIN_KEY),
        cfg.basic.public_base(),
    );

    TestApp {
        app: directory_router(state),
        services,
        fetcher,
        push,
        cfg,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(req)
            .await
            .expect("request failed")
    }

    /// Lists the manifest with the stub fetcher and submits it as alice.
    pub async fn submit(&self, manifest_url: &str, name: &str) -> Value {
        self.fetcher.set(manifest_url, manifest_body(name));
        let resp = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/pwas")
                    .header("content-type", "application/json")
                    .header("authorization", format!("Bearer {USER_TOKEN}"))
                    .body(Body::from(
                        json!({ "manifest_url": manifest_url }).to_string(),
                    ))
                    .expect("failed to build request"),
            )
            .await;
        assert!(resp.status().is_success(), "submit failed: {}", resp.status());
        body_json(resp).await
    }
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request")
}

pub fn admin(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-admin-key", ADMIN_KEY);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("failed to build request")
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body")
        .to_vec()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).expect("response body was not JSON")
}
