//! Capture triggering, serialization policy and failure handling

use std::sync::atomic::Ordering;
use std::sync::Arc;

use prepaint::capture::VOLATILE_ATTR;
use prepaint::{
    BootOutcome, ColdStartReason, Config, Element, EventCategory, LifecycleEvent,
    MemorySnapshotStore, Prepaint, StyleRecord,
};

use super::common::determinism::test_clock;
use super::common::fixtures::{
    container_html, empty_page, page_with, prepaint_over, DeniedOpener, StaticSheets,
};

#[tokio::test]
async fn test_setup_twice_installs_once_and_either_cleanup_removes() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = page_with("/", vec![Element::new("main")]);

    let first = prepaint.setup_capture(&page);
    let second = prepaint.setup_capture(&page);
    assert!(first.installed());
    assert!(!second.installed());
    assert_eq!(page.lifecycle_listener_count(), 1);

    second.cleanup();
    assert_eq!(page.lifecycle_listener_count(), 0);

    page.dispatch(LifecycleEvent::VisibilityHidden);
    prepaint.wait_for_pending_capture().await;
    assert_eq!(store.write_count(), 0);

    first.cleanup();
    assert_eq!(page.lifecycle_listener_count(), 0);
}

#[tokio::test]
async fn test_unload_burst_coalesces_into_one_write() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = page_with("/feed", vec![Element::new("main").with_text("feed")]);
    let handle = prepaint.setup_capture(&page);

    page.dispatch(LifecycleEvent::VisibilityHidden);
    page.dispatch(LifecycleEvent::PageHide { persisted: true });
    page.dispatch(LifecycleEvent::BeforeUnload);
    prepaint.wait_for_pending_capture().await;
    assert_eq!(store.write_count(), 1);

    page.dispatch(LifecycleEvent::VisibilityHidden);
    prepaint.wait_for_pending_capture().await;
    assert_eq!(store.write_count(), 2);

    handle.cleanup();
}

#[tokio::test]
async fn test_only_first_top_level_child_is_captured() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = page_with(
        "/",
        vec![
            Element::new("main").with_text("first"),
            Element::new("footer").with_text("second"),
        ],
    );

    let snapshot = prepaint.capture_snapshot(&page).await.unwrap();

    assert_eq!(snapshot.body, "<main>first</main>");
    assert!(!snapshot.body.contains("second"));
}

#[tokio::test]
async fn test_volatile_content_is_not_frozen() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = page_with(
        "/",
        vec![Element::new("main")
            .with_child(Element::new("h1").with_text("Inbox"))
            .with_child(
                Element::new("span")
                    .with_attr(VOLATILE_ATTR, "")
                    .with_text("3 online"),
            )],
    );

    let snapshot = prepaint.capture_snapshot(&page).await.unwrap();

    assert_eq!(
        snapshot.body,
        "<main><h1>Inbox</h1><span data-prepaint-volatile></span></main>"
    );
    assert_eq!(
        container_html(&page).as_deref(),
        Some("<main><h1>Inbox</h1><span data-prepaint-volatile>3 online</span></main>")
    );
}

#[tokio::test]
async fn test_same_origin_sheets_are_inlined() {
    let store = MemorySnapshotStore::new();
    let prepaint = Prepaint::new(Config::default(), Arc::new(store.clone()))
        .with_clock(test_clock())
        .with_fetcher(Arc::new(StaticSheets(vec![(
            "https://app.example.com/assets/app.css".to_string(),
            ".app{color:red}".to_string(),
        )])));
    let page = page_with("/", vec![Element::new("main")]);
    page.mutate(|doc| {
        let head = doc.head_mut();
        head.append_child(
            Element::new("link")
                .with_attr("rel", "stylesheet")
                .with_attr("href", "assets/app.css"),
        );
        head.append_child(
            Element::new("link")
                .with_attr("rel", "stylesheet")
                .with_attr("href", "https://fonts.example.org/font.css"),
        );
    });

    let snapshot = prepaint.capture_snapshot(&page).await.unwrap();

    assert_eq!(
        snapshot.styles,
        vec![
            StyleRecord::external(
                "https://app.example.com/assets/app.css",
                Some(".app{color:red}".to_string())
            ),
            StyleRecord::external("https://fonts.example.org/font.css", None),
        ]
    );
}

#[tokio::test]
async fn test_routes_outside_allow_list_are_skipped() {
    let store = MemorySnapshotStore::new();
    let config = Config::default().with_capture_routes(vec!["/".to_string()]);
    let (prepaint, _clock) = prepaint_over(&store, config);

    let skipped = page_with("/admin", vec![Element::new("main")]);
    assert!(prepaint.capture_snapshot(&skipped).await.is_none());

    let allowed = page_with("/", vec![Element::new("main")]);
    assert!(prepaint.capture_snapshot(&allowed).await.is_some());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_permission_denied_degrades_to_cold_start() {
    let opener = Arc::new(DeniedOpener::default());
    let prepaint = Prepaint::new(Config::default(), opener.clone()).with_clock(test_clock());
    let mut events = prepaint.subscribe().unwrap();
    let page = page_with("/", vec![Element::new("main").with_text("live")]);

    assert!(prepaint.capture_snapshot(&page).await.is_none());
    assert!(prepaint.is_disabled());

    let fresh = empty_page("/");
    let outcome = prepaint.boot(&fresh).await;
    assert_eq!(outcome, BootOutcome::ColdStart(ColdStartReason::Disabled));
    assert_eq!(container_html(&fresh).as_deref(), Some(""));

    // The session is disabled after the first failure
    assert_eq!(opener.opens.load(Ordering::SeqCst), 1);

    let first = events.recv().await.unwrap();
    assert_eq!(first.category, EventCategory::Storage);
    assert_eq!(first.kind, "permission-denied");
    let second = events.recv().await.unwrap();
    assert_eq!(second.category, EventCategory::Capture);
    assert_eq!(second.kind, "storage-write");
}

#[tokio::test]
async fn test_boot_with_denied_storage_is_cold_start() {
    let prepaint = Prepaint::new(Config::default(), Arc::new(DeniedOpener::default()));
    let page = empty_page("/");
    let before = page.html();

    let outcome = prepaint.boot(&page).await;
    match &outcome {
        BootOutcome::ColdStart(ColdStartReason::Failed(err)) => {
            assert_eq!(err.kind(), "storage-open");
            assert!(err.storage_error().is_some_and(|e| !e.is_recoverable()));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(outcome.error().is_some_and(|e| !e.is_recoverable()));
    assert_eq!(page.html(), before);
    assert!(prepaint.is_disabled());
}
