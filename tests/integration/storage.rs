//! SQLite-backed pipeline, age boundary and storage failure classes

use std::sync::Arc;

use chrono::Duration;
use prepaint::data::MAX_SNAPSHOT_AGE_DAYS;
use prepaint::{
    AttachOptions, AttachOutcome, BootOutcome, ColdStartReason, Config, Element,
    MemorySnapshotStore, Prepaint, Snapshot, SnapshotStore, SqliteStoreOpener, StaticFramework,
    StoreOpener,
};
use tempfile::TempDir;

use super::common::determinism::{test_clock, test_now};
use super::common::fixtures::{container_html, empty_page, page_with, prepaint_over};

fn sqlite_prepaint(dir: &TempDir) -> (Prepaint, Arc<prepaint::util::ManualClock>) {
    let db_path = dir.path().join("snapshots.db");
    let clock = test_clock();
    let prepaint = Prepaint::from_config(Config::default().with_database_path(db_path))
        .with_clock(clock.clone())
        .with_fetcher(Arc::new(prepaint::capture::NoFetch));
    (prepaint, clock)
}

#[tokio::test]
async fn test_sqlite_capture_then_restore_then_attach() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (prepaint, _clock) = sqlite_prepaint(&dir);
    let live = Element::new("div").with_attr("id", "x").with_text("A");

    let source = page_with("/", vec![live.clone()]);
    prepaint.capture_snapshot(&source).await.unwrap();

    let revisit = empty_page("/");
    assert!(prepaint.boot(&revisit).await.is_restored());
    assert_eq!(container_html(&revisit).as_deref(), Some(r#"<div id="x">A</div>"#));

    let report = prepaint
        .attach(&revisit, StaticFramework::new(), live, AttachOptions::new())
        .await;
    assert_eq!(report.outcome, AttachOutcome::Hydrated);
}

#[tokio::test]
async fn test_age_boundary_is_inclusive() {
    let store = MemorySnapshotStore::new();
    store.seed(Snapshot::new("/", "<main>cached</main>", test_now(), Vec::new()));
    let (prepaint, clock) = prepaint_over(&store, Config::default());

    clock.advance(Duration::days(MAX_SNAPSHOT_AGE_DAYS));
    assert!(prepaint.boot(&empty_page("/")).await.is_restored());

    clock.advance(Duration::microseconds(1));
    let page = empty_page("/");
    assert!(matches!(
        prepaint.boot(&page).await,
        BootOutcome::ColdStart(ColdStartReason::Expired { .. })
    ));
    assert_eq!(container_html(&page).as_deref(), Some(""));
}

#[tokio::test]
async fn test_age_boundary_survives_sqlite_precision() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (prepaint, clock) = sqlite_prepaint(&dir);
    prepaint
        .capture_snapshot(&page_with("/", vec![Element::new("main")]))
        .await
        .unwrap();

    clock.advance(Duration::days(7));
    assert!(prepaint.boot(&empty_page("/")).await.is_restored());

    clock.advance(Duration::microseconds(1));
    assert!(!prepaint.boot(&empty_page("/")).await.is_restored());
}

#[tokio::test]
async fn test_age_boundary_with_sub_microsecond_clock() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let (prepaint, clock) = sqlite_prepaint(&dir);
    clock.set(test_now() + Duration::nanoseconds(1_234_567));
    prepaint
        .capture_snapshot(&page_with("/", vec![Element::new("main")]))
        .await
        .unwrap();

    clock.advance(Duration::days(7));
    assert!(prepaint.boot(&empty_page("/")).await.is_restored());
}

#[tokio::test]
async fn test_corrupted_database_is_recoverable_cold_start() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("snapshots.db"), b"definitely not sqlite, just bytes")
        .expect("Failed to write file");
    let (prepaint, _clock) = sqlite_prepaint(&dir);
    let page = empty_page("/");

    match prepaint.boot(&page).await {
        BootOutcome::ColdStart(ColdStartReason::Failed(err)) => {
            assert_eq!(err.kind(), "storage-open");
            assert_eq!(err.storage_error().map(|e| e.kind()), Some("corrupted"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    let error = prepaint.boot(&page).await.error().expect("boot failure is reported");
    assert_eq!((error.phase(), error.kind()), ("boot", "storage-open"));
    assert!(error.is_recoverable());
    assert!(!prepaint.is_disabled());
    assert_eq!(container_html(&page).as_deref(), Some(""));
}

#[tokio::test]
async fn test_prune_and_list_through_opener() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let opener = SqliteStoreOpener::new(dir.path().join("snapshots.db"));
    let store = opener.open().await.unwrap();
    let now = test_now();

    store
        .put(&Snapshot::new("/old", "<p>old</p>", now - Duration::days(9), Vec::new()))
        .await
        .unwrap();
    store
        .put(&Snapshot::new("/new", "<p>new</p>", now, Vec::new()))
        .await
        .unwrap();

    let routes: Vec<String> = store.list().await.unwrap().into_iter().map(|s| s.route).collect();
    assert_eq!(routes, vec!["/new".to_string(), "/old".to_string()]);

    assert_eq!(store.prune_expired(Duration::days(7), now).await.unwrap(), 1);
    assert!(store.get("/old").await.unwrap().is_none());
    assert!(store.delete("/new").await.unwrap());
    assert_eq!(store.clear().await.unwrap(), 0);
}
