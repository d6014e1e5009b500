//! Boot restorer.
//!
//! Runs before the framework initializes: reads the snapshot for the current
//! route and, when it is fresh, paints it into the render container (or the
//! overlay layer) together with its styles, then marks the document root
//! with restore metadata. Everything is validated before the document is
//! touched, so a failure leaves the page exactly as it was.

mod handoff;
pub(crate) mod overlay;
mod sanitize;

use chrono::Duration;
use reqwest::Url;
use serde_json::json;

use crate::capture::STYLE_MARKER_ATTR;
use crate::core::{BootError, EventCategory, Prepaint, PrepaintError};
use crate::data::{Snapshot, StyleRecord};
use crate::dom::{parse_fragment, Element, Node};
use crate::page::Page;

pub use handoff::{handoff, RestoreMetadata, Strategy, OVERLAY_ATTR, STRATEGY_ATTR, TIMESTAMP_ATTR};
pub use overlay::OVERLAY_ID;
pub use sanitize::{Sanitizer, ScriptStripper};

/// Why boot left the page for a cold start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColdStartReason {
    /// A permission failure disabled prepaint for this session
    Disabled,
    NoSnapshot,
    Expired { age: Duration },
    /// The render container does not exist
    NoContainer,
    Failed(BootError),
}

impl ColdStartReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColdStartReason::Disabled => "disabled",
            ColdStartReason::NoSnapshot => "no-snapshot",
            ColdStartReason::Expired { .. } => "expired",
            ColdStartReason::NoContainer => "no-container",
            ColdStartReason::Failed(e) => e.kind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    Restored {
        route: String,
        age: Duration,
        overlay: bool,
    },
    ColdStart(ColdStartReason),
}

impl BootOutcome {
    pub fn is_restored(&self) -> bool {
        matches!(self, BootOutcome::Restored { .. })
    }

    /// The failure behind a cold start, if it was not a plain miss
    pub fn error(&self) -> Option<PrepaintError> {
        match self {
            BootOutcome::ColdStart(ColdStartReason::Failed(e)) => Some(e.clone().into()),
            _ => None,
        }
    }
}

fn inline_style(text: &str) -> Result<Element, BootError> {
    if text.to_ascii_lowercase().contains("</style") {
        return Err(BootError::StyleInjection(
            "style text terminates its element early".to_string(),
        ));
    }
    Ok(Element::new("style")
        .with_attr(STYLE_MARKER_ATTR, "")
        .with_text(text))
}

/// The marked head element that reproduces one style record
fn style_element(record: &StyleRecord) -> Result<Element, BootError> {
    match record {
        StyleRecord::Inline { text } => inline_style(text),
        StyleRecord::External {
            content: Some(text),
            ..
        } => inline_style(text),
        StyleRecord::External { href, content: None } => {
            let url = Url::parse(href).map_err(|e| {
                BootError::StyleInjection(format!("invalid stylesheet URL {href}: {e}"))
            })?;
            Ok(Element::new("link")
                .with_attr("rel", "stylesheet")
                .with_attr("href", url.as_str())
                .with_attr(STYLE_MARKER_ATTR, ""))
        }
    }
}

impl Prepaint {
    /// Paint the stored snapshot for the current route, if one is fresh.
    ///
    /// Never fails: every error ends in a cold start with the page untouched.
    pub async fn boot(&self, page: &Page) -> BootOutcome {
        match self.try_boot(page).await {
            Ok(outcome) => outcome,
            Err(error) => {
                self.log_failure(&PrepaintError::from(error.clone()), "boot");
                self.events().emit(
                    EventCategory::Restore,
                    "failed",
                    json!({
                        "route": page.route(),
                        "kind": error.kind(),
                        "message": error.to_string(),
                    }),
                );
                BootOutcome::ColdStart(ColdStartReason::Failed(error))
            }
        }
    }

    async fn try_boot(&self, page: &Page) -> Result<BootOutcome, BootError> {
        let route = page.route();
        if self.is_disabled() {
            return Ok(self.skip(&route, ColdStartReason::Disabled));
        }

        let Some(snapshot) = self.read_snapshot(&route).await? else {
            return Ok(self.skip(&route, ColdStartReason::NoSnapshot));
        };

        let now = self.now();
        let age = snapshot.age(now);
        if !snapshot.is_fresh(now, self.config().max_age) {
            return Ok(self.skip(&route, ColdStartReason::Expired { age }));
        }

        let mut nodes = parse_fragment(&snapshot.body)?;
        if let Some(sanitizer) = self.sanitizer() {
            sanitizer.sanitize(&mut nodes);
        }
        let styles = snapshot
            .styles
            .iter()
            .map(style_element)
            .collect::<Result<Vec<_>, _>>()?;

        let overlay = self.config().restore.overlay;
        let container_id = self.config().restore.container_id.as_str();
        let metadata = RestoreMetadata {
            timestamp: snapshot.timestamp,
            overlay,
        };
        let style_count = styles.len();

        let painted = page.mutate(move |doc| {
            if overlay {
                if doc.element_by_id(container_id).is_none() {
                    return false;
                }
                overlay::paint(doc, nodes);
            } else {
                let Some(container) = doc.element_by_id_mut(container_id) else {
                    return false;
                };
                container.children = nodes;
            }
            doc.head_mut()
                .children
                .extend(styles.into_iter().map(Node::from));
            metadata.write(doc);
            true
        });
        if !painted {
            return Ok(self.skip(&route, ColdStartReason::NoContainer));
        }

        tracing::info!(
            route = %route,
            age_ms = age.num_milliseconds(),
            overlay,
            styles = style_count,
            "Snapshot restored"
        );
        self.events().emit(
            EventCategory::Restore,
            "restored",
            json!({
                "route": route,
                "age_ms": age.num_milliseconds(),
                "overlay": overlay,
                "styles": style_count,
            }),
        );
        Ok(BootOutcome::Restored {
            route,
            age,
            overlay,
        })
    }

    /// Fetch the route's snapshot with a handle that lives only for the read
    async fn read_snapshot(&self, route: &str) -> Result<Option<Snapshot>, BootError> {
        let store = self.open_store().await.map_err(|e| {
            self.record_storage_error("open", &e);
            BootError::StorageOpen(e)
        })?;
        store.get(route).await.map_err(|source| {
            self.record_storage_error("get", &source);
            BootError::SnapshotRead {
                route: route.to_string(),
                source,
            }
        })
    }

    fn skip(&self, route: &str, reason: ColdStartReason) -> BootOutcome {
        tracing::debug!(route, reason = reason.as_str(), "Snapshot restore skipped");
        let mut payload = json!({ "route": route, "reason": reason.as_str() });
        if let ColdStartReason::Expired { age } = &reason {
            payload["age_ms"] = json!(age.num_milliseconds());
        }
        self.events().emit(EventCategory::Restore, "skipped", payload);
        BootOutcome::ColdStart(reason)
    }
}
