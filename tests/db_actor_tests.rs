use pwadir::db::{
    LighthouseReportCreate, PwaListQuery, PwaPatch, PwaPatchEnvelope, PwaSort, PwaUpsert,
};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_database_url(tag: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!(
        "pwadir-db-{tag}-{}-{nanos}.sqlite",
        std::process::id()
    ));
    format!("sqlite:{}", path.display())
}

fn upsert(manifest_url: &str, name: &str, user_id: &str) -> PwaUpsert {
    PwaUpsert {
        manifest_url: manifest_url.to_string(),
        start_url: manifest_url.replace("manifest.json", ""),
        name: Some(name.to_string()),
        short_name: None,
        description: Some(format!("{name} description")),
        background_color: None,
        theme_color: Some("#112233".to_string()),
        icon_url: None,
        manifest_json: format!(r#"{{"name":"{name}"}}"#),
        user_id: user_id.to_string(),
        user_email: Some(format!("{user_id}@example.com")),
    }
}

fn newest(limit: i64) -> PwaListQuery {
    PwaListQuery {
        sort: PwaSort::Newest,
        offset: 0,
        limit,
    }
}

#[tokio::test]
async fn pwa_upsert_keeps_identity_and_visibility() {
    let db = pwadir::db::spawn(&temp_database_url("upsert")).await;

    let first = db
        .upsert_pwa(upsert("https://a.example/manifest.json", "Alpha", "u1"))
        .await
        .unwrap();
    assert!(first.created);

    let pwa = db.get_pwa(first.id).await.unwrap().expect("row exists");
    assert_eq!(pwa.name.as_deref(), Some("Alpha"));
    assert_eq!(pwa.user_id, "u1");
    assert!(pwa.visible);
    assert_eq!(pwa.lighthouse_score, None);

    // Hide, then resubmit from another user: same row, submitter and visibility kept.
    db.patch_pwa(PwaPatchEnvelope {
        id: first.id,
        patch: PwaPatch {
            visible: Some(false),
        },
    })
    .await
    .unwrap();

    let second = db
        .upsert_pwa(upsert("https://a.example/manifest.json", "Alpha 2", "u2"))
        .await
        .unwrap();
    assert_eq!(second.id, first.id);
    assert!(!second.created);

    let pwa = db.get_pwa(first.id).await.unwrap().expect("row exists");
    assert_eq!(pwa.name.as_deref(), Some("Alpha 2"));
    assert_eq!(pwa.user_id, "u1");
    assert!(!pwa.visible);
    assert!(pwa.updated_at >= pwa.created_at);

    // Hidden rows are not listed.
    let page = db.list_pwas(newest(10)).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(page.items.is_empty());
    assert!(db.list_visible_pwas().await.unwrap().is_empty());

    assert!(db.get_pwa(9999).await.unwrap().is_none());
}

#[tokio::test]
async fn listing_pages_and_sorts() {
    let db = pwadir::db::spawn(&temp_database_url("list")).await;

    let mut ids = Vec::new();
    for (i, name) in ["Charlie", "alpha", "Bravo"].iter().enumerate() {
        let out = db
            .upsert_pwa(upsert(
                &format!("https://{i}.example/manifest.json"),
                name,
                "u1",
            ))
            .await
            .unwrap();
        ids.push(out.id);
    }

    db.insert_lighthouse_report(LighthouseReportCreate {
        pwa_id: ids[0],
        score: 40,
        report_json: "{}".to_string(),
    })
    .await
    .unwrap();
    db.insert_lighthouse_report(LighthouseReportCreate {
        pwa_id: ids[2],
        score: 90,
        report_json: "{}".to_string(),
    })
    .await
    .unwrap();

    let page = db.list_pwas(newest(2)).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].id, ids[2]);
    assert_eq!(page.items[1].id, ids[1]);

    let rest = db
        .list_pwas(PwaListQuery {
            offset: 2,
            ..newest(2)
        })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].id, ids[0]);

    // Unscored PWAs go last.
    let by_score = db
        .list_pwas(PwaListQuery {
            sort: PwaSort::Score,
            ..newest(10)
        })
        .await
        .unwrap();
    let order: Vec<i64> = by_score.items.iter().map(|p| p.id).collect();
    assert_eq!(order, vec![ids[2], ids[0], ids[1]]);

    let by_name = db
        .list_pwas(PwaListQuery {
            sort: PwaSort::Name,
            ..newest(10)
        })
        .await
        .unwrap();
    let names: Vec<&str> = by_name.items.iter().map(|p| p.display_name()).collect();
    assert_eq!(names, vec!["alpha", "Bravo", "Charlie"]);

    let (_, count) = db.index_stamp().await.unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn lighthouse_reports_update_score_and_history() {
    let db = pwadir::db::spawn(&temp_database_url("lighthouse")).await;
    let id = db
        .upsert_pwa(upsert("https://lh.example/manifest.json", "Lh", "u1"))
        .await
        .unwrap()
        .id;

    assert!(db.latest_lighthouse_report(id).await.unwrap().is_none());

    for score in [55, 80] {
        db.insert_lighthouse_report(LighthouseReportCreate {
            pwa_id: id,
            score,
            report_json: format!(r#"{{"score":{score}}}"#),
        })
        .await
        .unwrap();
    }

    let pwa = db.get_pwa(id).await.unwrap().expect("row exists");
    assert_eq!(pwa.lighthouse_score, Some(80));

    let history = db.list_lighthouse_reports(id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].score, 80);
    assert_eq!(history[1].score, 55);

    let latest = db
        .latest_lighthouse_report(id)
        .await
        .unwrap()
        .expect("report exists");
    assert_eq!(latest.score, 80);
    assert_eq!(latest.report_json, r#"{"score":80}"#);

    let missing = db
        .insert_lighthouse_report(LighthouseReportCreate {
            pwa_id: 9999,
            score: 10,
            report_json: "{}".to_string(),
        })
        .await;
    assert!(matches!(missing, Err(pwadir::DirectoryError::NotFound(_))));
}

#[tokio::test]
async fn favorites_and_tasks_follow_the_pwa() {
    let db = pwadir::db::spawn(&temp_database_url("fav-task")).await;
    let a = db
        .upsert_pwa(upsert("https://fa.example/manifest.json", "Fa", "u1"))
        .await
        .unwrap()
        .id;
    let b = db
        .upsert_pwa(upsert("https://fb.example/manifest.json", "Fb", "u1"))
        .await
        .unwrap()
        .id;

    db.add_favorite("alice", a).await.unwrap();
    db.add_favorite("alice", a).await.unwrap();
    db.add_favorite("alice", b).await.unwrap();
    assert_eq!(db.list_favorites("alice").await.unwrap().len(), 2);
    assert!(db.list_favorites("bob").await.unwrap().is_empty());

    assert!(db.remove_favorite("alice", b).await.unwrap());
    assert!(!db.remove_favorite("alice", b).await.unwrap());

    // Queue: one entry per PWA, FIFO, unknown ids refused.
    assert!(db.push_task(a).await.unwrap());
    assert!(db.push_task(b).await.unwrap());
    assert!(db.push_task(a).await.unwrap());
    assert!(!db.push_task(9999).await.unwrap());
    assert_eq!(db.count_tasks().await.unwrap(), 2);

    let popped = db.pop_tasks(1).await.unwrap();
    assert_eq!(popped.len(), 1);
    assert_eq!(popped[0].pwa_id, b);
    assert_eq!(popped[0].attempts, 0);

    db.requeue_task(popped[0].clone()).await.unwrap();
    let all = db.pop_tasks(10).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].pwa_id, a);
    assert_eq!(all[1].pwa_id, b);
    assert_eq!(all[1].attempts, 1);

    assert_eq!(db.enqueue_all().await.unwrap(), 2);
    assert_eq!(db.enqueue_all().await.unwrap(), 0);

    // Deleting a PWA takes its favorites and tasks with it.
    assert!(db.delete_pwa(a).await.unwrap());
    assert!(!db.delete_pwa(a).await.unwrap());
    assert!(db.list_favorites("alice").await.unwrap().is_empty());
    assert_eq!(db.count_tasks().await.unwrap(), 1);
}
