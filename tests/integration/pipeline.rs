//! End-to-end capture, restore and attach scenarios

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use chrono::Duration;
use prepaint::boot::{RestoreMetadata, OVERLAY_ID};
use prepaint::capture::STYLE_MARKER_ATTR;
use prepaint::{
    handoff, AttachOptions, AttachOutcome, BootOutcome, ColdStartReason, Config, Element,
    EventCategory, HydrationError, MemorySnapshotStore, MismatchKind, ScriptStripper, Snapshot,
    StaticFramework, Strategy, StyleRecord,
};

use super::common::determinism::test_now;
use super::common::fixtures::{
    container_children, container_html, empty_page, page_with, prepaint_over,
    CountingTransitions, TwoMismatchFramework,
};

fn warm_store() -> MemorySnapshotStore {
    let store = MemorySnapshotStore::new();
    store.seed(Snapshot::new("/", r#"<div id="x">A</div>"#, test_now(), Vec::new()));
    store
}

fn view(text: &str) -> Element {
    Element::new("div").with_attr("id", "x").with_text(text)
}

#[tokio::test]
async fn test_cold_start_leaves_page_untouched() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    let before = page.html();

    let outcome = prepaint.boot(&page).await;

    assert_eq!(outcome, BootOutcome::ColdStart(ColdStartReason::NoSnapshot));
    assert_eq!(page.html(), before);
    assert_eq!(page.read(handoff), Strategy::ColdStart);
}

#[tokio::test]
async fn test_warm_restore_paints_body_and_metadata() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");

    let outcome = prepaint.boot(&page).await;

    assert!(outcome.is_restored());
    assert_eq!(container_html(&page).as_deref(), Some(r#"<div id="x">A</div>"#));
    assert_eq!(page.read(handoff), Strategy::HasPrepaint);
    let metadata = page.read(RestoreMetadata::read).unwrap();
    assert_eq!(metadata.timestamp, test_now());
    assert!(!metadata.overlay);
}

#[tokio::test]
async fn test_mismatch_recovery_renders_live_content() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    prepaint.boot(&page).await;

    let report = prepaint
        .attach(&page, StaticFramework::new(), view("B"), AttachOptions::new())
        .await;

    assert_eq!(report.strategy, Strategy::HasPrepaint);
    match &report.outcome {
        AttachOutcome::RecoveredFromMismatch(err) => assert_eq!(err.kind, MismatchKind::Content),
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(report.fresh_renders, 1);
    assert_eq!(container_html(&page).as_deref(), Some(r#"<div id="x">B</div>"#));
    assert_eq!(page.read(handoff), Strategy::ColdStart);
    assert!(page.read(|doc| doc.root().attributes.is_empty()));
}

#[tokio::test]
async fn test_matching_restore_hydrates_without_render() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    prepaint.boot(&page).await;

    let framework = StaticFramework::new();
    let stats = framework.stats();
    let report = prepaint
        .attach(&page, framework, view("A"), AttachOptions::new())
        .await;

    assert_eq!(report.outcome, AttachOutcome::Hydrated);
    assert_eq!((stats.hydrations(), stats.renders()), (1, 0));
    assert_eq!(container_html(&page).as_deref(), Some(r#"<div id="x">A</div>"#));
}

#[tokio::test]
async fn test_two_errors_cause_one_fresh_render() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    prepaint.boot(&page).await;

    let seen: Arc<Mutex<Vec<HydrationError>>> = Arc::default();
    let hook_seen = seen.clone();
    let framework = TwoMismatchFramework::default();
    let renders = framework.renders.clone();

    let report = prepaint
        .attach(
            &page,
            framework,
            view("B"),
            AttachOptions::new().on_hydration_error(move |err| {
                hook_seen.lock().unwrap().push(err.clone());
            }),
        )
        .await;

    assert_eq!(renders.load(Ordering::SeqCst), 1);
    assert_eq!(report.fresh_renders, 1);
    assert_eq!(report.hydration_errors.len(), 2);
    let kinds: Vec<MismatchKind> = seen.lock().unwrap().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![MismatchKind::Content, MismatchKind::Structure]);
}

#[tokio::test]
async fn test_guard_corrects_stray_top_level_child() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    prepaint.boot(&page).await;

    let framework = StaticFramework::new();
    let stats = framework.stats();
    prepaint
        .attach(&page, framework, view("A"), AttachOptions::new())
        .await;

    page.mutate(|doc| {
        if let Some(container) = doc.element_by_id_mut("root") {
            container.append_child(Element::new("div").with_text("leaked snapshot"));
        }
    });

    assert_eq!(container_children(&page), Some(1));
    assert_eq!(container_html(&page).as_deref(), Some(r#"<div id="x">A</div>"#));
    assert_eq!(stats.renders(), 1);
    assert_eq!(prepaint.guard_corrections(), Some(1));
}

#[tokio::test]
async fn test_repeated_attach_does_not_accumulate_listeners() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");

    for _ in 0..3 {
        prepaint
            .attach(&page, StaticFramework::new(), view("A"), AttachOptions::new())
            .await;
    }

    assert_eq!(page.observer_count(), 1);
    assert_eq!(page.lifecycle_listener_count(), 1);
    assert!(prepaint.uninstall_guard());
    assert_eq!(page.observer_count(), 0);
}

#[tokio::test]
async fn test_round_trip_restores_markup_and_styles() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let content = Element::new("section")
        .with_attr("class", "inbox")
        .with_child(Element::new("h1").with_text("Mail & more"))
        .with_child(Element::new("input").with_attr("disabled", ""));
    let source = page_with("/inbox", vec![content.clone(), Element::new("aside")]);
    source.mutate(|doc| {
        doc.head_mut()
            .append_child(Element::new("style").with_text(".inbox{display:grid}"));
    });

    let snapshot = prepaint.capture_snapshot(&source).await.unwrap();
    assert_eq!(snapshot.body, content.outer_html());
    assert_eq!(snapshot.styles, vec![StyleRecord::inline(".inbox{display:grid}")]);

    let revisit = empty_page("/inbox");
    assert!(prepaint.boot(&revisit).await.is_restored());
    assert_eq!(container_html(&revisit), Some(content.outer_html()));
    let injected: Vec<String> = revisit.read(|doc| {
        doc.head()
            .element_children()
            .filter(|el| el.has_attr(STYLE_MARKER_ATTR))
            .map(Element::text_content)
            .collect()
    });
    assert_eq!(injected, vec![".inbox{display:grid}".to_string()]);

    let elsewhere = empty_page("/settings");
    assert_eq!(
        prepaint.boot(&elsewhere).await,
        BootOutcome::ColdStart(ColdStartReason::NoSnapshot)
    );
    assert_eq!(container_html(&elsewhere).as_deref(), Some(""));
}

#[tokio::test]
async fn test_attach_removes_injected_styles() {
    let store = MemorySnapshotStore::new();
    store.seed(Snapshot::new(
        "/",
        "<main>hi</main>",
        test_now(),
        vec![
            StyleRecord::inline("main{}"),
            StyleRecord::external("https://cdn.example.net/lib.css", None),
        ],
    ));
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    page.mutate(|doc| {
        doc.head_mut()
            .append_child(Element::new("style").with_text("app{}"));
    });
    prepaint.boot(&page).await;
    assert_eq!(page.read(|doc| doc.head().element_child_count()), 3);

    prepaint
        .attach(
            &page,
            StaticFramework::new(),
            Element::new("main").with_text("hi"),
            AttachOptions::new(),
        )
        .await;

    let head: Vec<String> =
        page.read(|doc| doc.head().element_children().map(Element::outer_html).collect());
    assert_eq!(head, vec!["<style>app{}</style>".to_string()]);
}

#[tokio::test]
async fn test_overlay_mode_leaves_container_for_framework() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default().with_overlay(true));
    let page = empty_page("/");

    let outcome = prepaint.boot(&page).await;

    assert!(matches!(outcome, BootOutcome::Restored { overlay: true, .. }));
    assert_eq!(container_html(&page).as_deref(), Some(""));
    let overlay = page
        .read(|doc| doc.element_by_id(OVERLAY_ID).map(Element::inner_html))
        .unwrap();
    assert_eq!(overlay, r#"<div id="x">A</div>"#);
    assert!(page.read(RestoreMetadata::read).unwrap().overlay);

    let report = prepaint
        .attach(&page, StaticFramework::new(), view("A"), AttachOptions::new())
        .await;

    assert_eq!(report.outcome, AttachOutcome::FreshRender);
    assert_eq!(container_html(&page).as_deref(), Some(r#"<div id="x">A</div>"#));
    assert!(page.read(|doc| doc.element_by_id(OVERLAY_ID).is_none()));
    assert_eq!(page.read(handoff), Strategy::ColdStart);
}

#[tokio::test]
async fn test_expired_snapshot_is_not_restored() {
    let store = warm_store();
    let (prepaint, clock) = prepaint_over(&store, Config::default());
    clock.advance(Duration::days(8));
    let page = empty_page("/");

    let outcome = prepaint.boot(&page).await;

    assert_eq!(
        outcome,
        BootOutcome::ColdStart(ColdStartReason::Expired {
            age: Duration::days(8)
        })
    );
    assert_eq!(container_html(&page).as_deref(), Some(""));
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_malformed_body_falls_back_without_painting() {
    let store = MemorySnapshotStore::new();
    store.seed(Snapshot::new(
        "/",
        "<div><span></div>",
        test_now(),
        vec![StyleRecord::inline("div{}")],
    ));
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let page = empty_page("/");
    let before = page.html();

    let outcome = prepaint.boot(&page).await;

    match outcome {
        BootOutcome::ColdStart(ColdStartReason::Failed(err)) => {
            assert_eq!(err.kind(), "tree-restore")
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert_eq!(page.html(), before);
}

#[tokio::test]
async fn test_sanitizer_runs_on_restore() {
    let store = MemorySnapshotStore::new();
    store.seed(Snapshot::new(
        "/",
        r#"<div onclick="steal()">ok<script>steal()</script></div>"#,
        test_now(),
        Vec::new(),
    ));
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let prepaint = Arc::try_unwrap(prepaint)
        .expect("sole owner")
        .with_sanitizer(Arc::new(ScriptStripper));
    let page = empty_page("/");

    prepaint.boot(&page).await;

    assert_eq!(container_html(&page).as_deref(), Some("<div>ok</div>"));
}

#[tokio::test]
async fn test_transitions_wrap_attach_unless_disabled() {
    let store = MemorySnapshotStore::new();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let transitions = Arc::new(CountingTransitions::default());
    let page = Arc::new(
        prepaint::Page::new(super::common::fixtures::url("/"))
            .with_document(prepaint::Document::with_container("root"))
            .with_transitions(transitions.clone()),
    );

    let report = prepaint
        .attach(&page, StaticFramework::new(), view("A"), AttachOptions::new())
        .await;
    assert!(report.transitions);
    assert_eq!(transitions.started.load(Ordering::SeqCst), 1);

    let report = prepaint
        .attach(
            &page,
            StaticFramework::new(),
            view("A"),
            AttachOptions::new().without_transitions(),
        )
        .await;
    assert!(!report.transitions);
    assert_eq!(transitions.started.load(Ordering::SeqCst), 1);
    assert_eq!(container_children(&page), Some(1));
}

#[tokio::test]
async fn test_events_cover_restore_handoff_and_hydration() {
    let store = warm_store();
    let (prepaint, _clock) = prepaint_over(&store, Config::default());
    let mut events = prepaint.subscribe().unwrap();
    let page = empty_page("/");

    prepaint.boot(&page).await;
    prepaint
        .attach(&page, StaticFramework::new(), view("B"), AttachOptions::new())
        .await;

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push((event.category, event.kind));
    }
    assert_eq!(
        seen,
        vec![
            (EventCategory::Restore, "restored".to_string()),
            (EventCategory::Handoff, "decided".to_string()),
            (EventCategory::Hydration, "mismatch".to_string()),
        ]
    );
}
