mod common;

use axum::http::StatusCode;
use common::{get, spawn_app};
use pwadir_manifest::IssueCode;
use pwadir::config::TasksConfig;
use pwadir::pwa::RefreshOutcome;
use pwadir::tasks::TaskWorkerHandle;
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;

const WEATHER: &str = "https://weather.example/manifest.json";

fn fast_tasks() -> TasksConfig {
    TasksConfig {
        enabled: true,
        poll_interval_secs: 3600,
        batch_size: 4,
        per_minute: 600,
        max_attempts: 3,
    }
}

/// Nudges the worker until `done` holds or five seconds pass.
async fn wait_until<F, Fut>(worker: &TaskWorkerHandle, mut done: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if done().await {
            return true;
        }
        let _ = worker.poll_now();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    done().await
}

#[tokio::test]
async fn refresh_updates_or_hides() {
    let t = spawn_app("refresh").await;
    let created = t.submit(WEATHER, "Weather").await;
    let id = created["pwa"]["id"].as_i64().expect("id");
    let pwa = t.services.pwa.clone();

    // Renamed upstream: listing follows.
    t.fetcher.set(WEATHER, common::manifest_body("Weather Pro"));
    match pwa.refresh(id).await.expect("refresh") {
        RefreshOutcome::Updated(p) => assert_eq!(p.name.as_deref(), Some("Weather Pro")),
        other => panic!("expected update, got {other:?}"),
    }
    assert!(pwa.get(id).await.expect("row").visible);

    // Unreachable (404): an error, the listing stays as it was.
    t.fetcher.remove(WEATHER);
    let err = pwa.refresh(id).await.expect_err("fetch fails");
    assert!(matches!(
        err,
        pwadir::DirectoryError::ManifestUnavailable(StatusCode::NOT_FOUND)
    ));
    let row = pwa.get(id).await.expect("row");
    assert!(row.visible);
    assert_eq!(row.name.as_deref(), Some("Weather Pro"));

    // No longer a valid manifest: hidden.
    t.fetcher
        .set(WEATHER, json!({ "start_url": "/" }).to_string());
    match pwa.refresh(id).await.expect("refresh") {
        RefreshOutcome::Hidden { issues } => assert!(!issues.is_empty()),
        other => panic!("expected hide, got {other:?}"),
    }
    assert!(!pwa.get(id).await.expect("row").visible);

    // Body no longer parses: hidden as unreadable.
    pwa.set_visibility(id, true).await.expect("show");
    t.fetcher.set(WEATHER, "<html>".to_string());
    match pwa.refresh(id).await.expect("refresh") {
        RefreshOutcome::Hidden { issues } => {
            assert!(issues.iter().any(|i| i.code == IssueCode::Unreadable));
        }
        other => panic!("expected hide, got {other:?}"),
    }
    assert!(!pwa.get(id).await.expect("row").visible);

    // Grew past the size cap: hidden as unreadable.
    pwa.set_visibility(id, true).await.expect("show");
    t.fetcher.set_oversize(WEATHER);
    match pwa.refresh(id).await.expect("refresh") {
        RefreshOutcome::Hidden { issues } => {
            assert!(issues.iter().any(|i| i.code == IssueCode::Unreadable));
        }
        other => panic!("expected hide, got {other:?}"),
    }
    assert!(!pwa.get(id).await.expect("row").visible);

    // Unknown ids surface as NotFound.
    assert!(matches!(
        pwa.refresh(9999).await,
        Err(pwadir::DirectoryError::NotFound(_))
    ));
}

#[tokio::test]
async fn queue_pops_oldest_first() {
    let t = spawn_app("queue").await;
    let a = t.submit("https://a.example/manifest.json", "Alpha").await["pwa"]["id"]
        .as_i64()
        .expect("id");
    let b = t.submit("https://b.example/manifest.json", "Beta").await["pwa"]["id"]
        .as_i64()
        .expect("id");
    let queue = t.services.tasks.clone();

    assert!(queue.pop().await.expect("pop").is_none());

    queue.push(a).await.expect("push");
    queue.push(b).await.expect("push");
    assert_eq!(queue.len().await.expect("len"), 2);

    let first = queue.pop().await.expect("pop").expect("task");
    assert_eq!(first.pwa_id, a);
    assert_eq!(queue.len().await.expect("len"), 1);

    let second = queue.pop().await.expect("pop").expect("task");
    assert_eq!(second.pwa_id, b);
    assert!(queue.pop().await.expect("pop").is_none());
    assert!(queue.is_empty().await.expect("len"));
}

#[tokio::test]
async fn worker_drains_the_queue() {
    let t = spawn_app("worker").await;
    let created = t.submit(WEATHER, "Weather").await;
    let id = created["pwa"]["id"].as_i64().expect("id");

    t.fetcher
        .set(WEATHER, json!({ "start_url": "/" }).to_string());
    t.services.tasks.push(id).await.expect("push");

    let worker = TaskWorkerHandle::spawn(
        t.services.tasks.clone(),
        t.services.pwa.clone(),
        fast_tasks(),
    )
    .await
    .expect("worker spawns");

    let pwa = t.services.pwa.clone();
    let hidden = wait_until(&worker, || {
        let pwa = pwa.clone();
        async move { pwa.get(id).await.map(|p| !p.visible).unwrap_or(false) }
    })
    .await;
    assert!(hidden, "worker never hid the PWA");
    assert!(t.services.tasks.is_empty().await.expect("len"));

    let resp = t.send(get(&format!("/pwas/{id}"))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    worker.stop();
}

#[tokio::test]
async fn worker_gives_up_after_max_attempts() {
    let t = spawn_app("worker-retry").await;
    let created = t.submit(WEATHER, "Weather").await;
    let id = created["pwa"]["id"].as_i64().expect("id");

    t.fetcher.remove(WEATHER);
    let before = t.fetcher.fetches.load(Ordering::SeqCst);
    t.services.tasks.push(id).await.expect("push");

    let worker = TaskWorkerHandle::spawn(
        t.services.tasks.clone(),
        t.services.pwa.clone(),
        fast_tasks(),
    )
    .await
    .expect("worker spawns");

    // One fetch per attempt, then the task is dropped.
    let fetcher = t.fetcher.clone();
    let exhausted = wait_until(&worker, || {
        let fetcher = fetcher.clone();
        async move { fetcher.fetches.load(Ordering::SeqCst) >= before + 3 }
    })
    .await;
    assert!(exhausted, "worker stopped retrying early");

    let tasks = t.services.tasks.clone();
    let drained = wait_until(&worker, || {
        let tasks = tasks.clone();
        async move { tasks.is_empty().await.unwrap_or(false) }
    })
    .await;
    assert!(drained);

    for _ in 0..5 {
        let _ = worker.poll_now();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(t.fetcher.fetches.load(Ordering::SeqCst), before + 3);
    assert!(t.services.pwa.get(id).await.expect("row").visible);

    worker.stop();
}
