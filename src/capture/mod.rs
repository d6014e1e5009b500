//! Capture engine.
//!
//! Serializes the first element child of the render container together with
//! the document's active styling and writes it to the snapshot store, keyed
//! by the current route. Capture never fails outward: every problem is
//! logged, emitted, and turned into "no snapshot this time".

mod scheduler;
mod styles;

use serde_json::json;

use crate::core::{CaptureError, EventCategory, Prepaint, PrepaintError};
use crate::data::Snapshot;
use crate::dom::Element;
use crate::page::Page;

pub use scheduler::CaptureHandle;
pub(crate) use scheduler::CaptureState;
pub use styles::{FetchError, HttpStylesheetFetcher, NoFetch, StylesheetFetcher, STYLE_MARKER_ATTR};

use styles::{collect_styles, style_sources};

/// Elements with this attribute have their text cleared before capture
pub const VOLATILE_ATTR: &str = "data-prepaint-volatile";

/// Clear the contents of every volatile element under `root`, including itself
fn clear_volatile(root: &mut Element) -> usize {
    let mut cleared = 0;
    root.for_each_element_mut(&mut |el| {
        if el.has_attr(VOLATILE_ATTR) {
            el.set_text_content("");
            cleared += 1;
        }
    });
    cleared
}

impl Prepaint {
    /// Capture the current route into the snapshot store.
    ///
    /// Returns the stored snapshot, or `None` when there was nothing to
    /// capture, capture is not allowed for the route, or the write failed.
    pub async fn capture_snapshot(&self, page: &Page) -> Option<Snapshot> {
        if self.is_disabled() {
            tracing::debug!("Capture skipped; prepaint disabled for this session");
            return None;
        }

        let route = page.route();
        if !self.config().capture.allows(&route) {
            tracing::debug!(route = %route, "Capture skipped; route not in allow-list");
            return None;
        }

        let base = page.location();
        let container_id = self.config().restore.container_id.as_str();
        let prepared = page.read(|doc| {
            let root = doc.element_by_id(container_id)?.first_element_child()?.clone();
            Some((root, style_sources(doc.head(), &base)))
        });
        let Some((mut root, sources)) = prepared else {
            tracing::debug!(route = %route, container_id, "Nothing to capture");
            return None;
        };

        let cleared = clear_volatile(&mut root);
        let body = root.outer_html();
        if body.trim().is_empty() {
            self.report_capture_error(&CaptureError::EmptyMarkup { route });
            return None;
        }

        let collected = collect_styles(
            sources,
            &base,
            self.config().capture.inline_same_origin_styles,
            self.fetcher(),
        )
        .await;
        for failure in &collected.failures {
            self.report_capture_error(failure);
        }

        let snapshot = Snapshot::new(route, body, self.now(), collected.records);
        let written = match self.open_store().await {
            Ok(store) => store.put(&snapshot).await,
            Err(e) => Err(e),
        };
        if let Err(source) = written {
            self.record_storage_error("put", &source);
            self.report_capture_error(&CaptureError::StorageWrite {
                route: snapshot.route.clone(),
                source,
            });
            return None;
        }

        tracing::debug!(
            route = %snapshot.route,
            bytes = snapshot.body.len(),
            styles = snapshot.styles.len(),
            volatile_cleared = cleared,
            "Snapshot captured"
        );
        self.events().emit(
            EventCategory::Capture,
            "snapshot-saved",
            json!({
                "route": snapshot.route,
                "bytes": snapshot.body.len(),
                "styles": snapshot.styles.len(),
                "timestamp": snapshot.timestamp,
            }),
        );
        Some(snapshot)
    }

    fn report_capture_error(&self, error: &CaptureError) {
        match error {
            CaptureError::StyleCollect { .. } => {
                tracing::debug!(kind = error.kind(), error = %error, "Stylesheet kept by reference")
            }
            _ => self.log_failure(&PrepaintError::from(error.clone()), "capture"),
        }
        self.events().emit(
            EventCategory::Capture,
            error.kind(),
            json!({ "message": error.to_string() }),
        );
    }
}
