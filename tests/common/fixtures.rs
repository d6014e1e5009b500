//! Page, store and framework fixtures

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use prepaint::capture::{FetchError, NoFetch, StylesheetFetcher};
use prepaint::framework::ErrorSink;
use prepaint::page::ViewTransitions;
use prepaint::util::ManualClock;
use prepaint::{
    Config, Document, Element, Framework, FrameworkError, MemorySnapshotStore, Page, Prepaint,
    SnapshotStore, StorageError, StoreOpener,
};
use reqwest::Url;

use super::determinism::test_clock;

pub const ORIGIN: &str = "https://app.example.com";

pub fn url(route: &str) -> Url {
    Url::parse(ORIGIN)
        .and_then(|base| base.join(route))
        .expect("Invalid test URL")
}

/// A page at `route` with an empty `#root` container
pub fn empty_page(route: &str) -> Arc<Page> {
    Arc::new(Page::new(url(route)).with_document(Document::with_container("root")))
}

/// A page at `route` whose `#root` container holds `children`
pub fn page_with(route: &str, children: Vec<Element>) -> Arc<Page> {
    let mut doc = Document::with_container("root");
    if let Some(container) = doc.element_by_id_mut("root") {
        for child in children {
            container.append_child(child);
        }
    }
    Arc::new(Page::new(url(route)).with_document(doc))
}

/// Inner markup of `#root`
pub fn container_html(page: &Page) -> Option<String> {
    page.read(|doc| doc.element_by_id("root").map(Element::inner_html))
}

pub fn container_children(page: &Page) -> Option<usize> {
    page.read(|doc| doc.element_by_id("root").map(Element::element_child_count))
}

/// A context over `store` with a manual clock and no network access
pub fn prepaint_over(store: &MemorySnapshotStore, config: Config) -> (Arc<Prepaint>, Arc<ManualClock>) {
    let clock = test_clock();
    let prepaint = Prepaint::new(config, Arc::new(store.clone()))
        .with_clock(clock.clone())
        .with_fetcher(Arc::new(NoFetch));
    (Arc::new(prepaint), clock)
}

/// Every open fails with a permission error
#[derive(Default)]
pub struct DeniedOpener {
    pub opens: AtomicUsize,
}

#[async_trait]
impl StoreOpener for DeniedOpener {
    async fn open(&self) -> Result<Box<dyn SnapshotStore>, StorageError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::PermissionDenied(
            "access to snapshot storage denied".to_string(),
        ))
    }
}

/// Serves fixed stylesheet bodies by URL
pub struct StaticSheets(pub Vec<(String, String)>);

#[async_trait]
impl StylesheetFetcher for StaticSheets {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.0
            .iter()
            .find(|(href, _)| href == url.as_str())
            .map(|(_, body)| body.clone())
            .ok_or(FetchError::Status { status: 404 })
    }
}

/// Reports two recoverable errors on every hydrate and counts fresh renders
#[derive(Default)]
pub struct TwoMismatchFramework {
    pub renders: Arc<AtomicUsize>,
}

impl Framework for TwoMismatchFramework {
    type View = Element;

    fn hydrate(
        &mut self,
        _container: &mut Element,
        _view: &Element,
        errors: ErrorSink,
    ) -> Result<(), FrameworkError> {
        errors.report("Text content does not match server-rendered HTML.");
        errors.report("Hydration failed because the initial UI does not match what was rendered on the server.");
        Ok(())
    }

    fn render(&mut self, container: &mut Element, view: &Element) -> Result<(), FrameworkError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        container.clear_children();
        container.append_child(view.clone());
        Ok(())
    }

    fn unmount(&mut self, container: &mut Element) {
        container.clear_children();
    }
}

/// Transition primitive that records how often it was started
#[derive(Default)]
pub struct CountingTransitions {
    pub started: AtomicUsize,
}

impl ViewTransitions for CountingTransitions {
    fn start(&self, update: &mut dyn FnMut()) {
        self.started.fetch_add(1, Ordering::SeqCst);
        update();
    }
}
