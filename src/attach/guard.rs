//! Root guard: keeps the render container at exactly one element child.
//!
//! The guard is a level-triggered check over that predicate. It runs after
//! every document mutation and on restore-adjacent lifecycle signals, and
//! can be run on demand for environments without observation. On violation
//! it calls a narrow reset capability, never the attach state machine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use serde_json::json;

use crate::core::{EventCategory, EventEmitter};
use crate::dom::Element;
use crate::page::{ListenerId, Page};

/// Discard whatever the container holds and render fresh
pub trait ResetToFresh: Send + Sync {
    fn reset(&self, page: &Page);
}

struct GuardState {
    container_id: String,
    reset: Arc<dyn ResetToFresh>,
    resetting: AtomicBool,
    corrections: AtomicUsize,
    events: EventEmitter,
}

impl GuardState {
    fn check(&self, page: &Page) {
        if self.resetting.load(Ordering::SeqCst) {
            return;
        }
        let children = page.read(|doc| {
            doc.element_by_id(&self.container_id)
                .map(Element::element_child_count)
        });
        // A missing container has nothing to guard
        let Some(children) = children else {
            return;
        };
        if children == 1 || self.resetting.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::warn!(
            container_id = %self.container_id,
            children,
            "Render container has unexpected top-level children; resetting"
        );
        self.events.emit(
            EventCategory::Guard,
            "violation",
            json!({ "container_id": self.container_id, "children": children }),
        );

        self.reset.reset(page);
        self.corrections.fetch_add(1, Ordering::SeqCst);
        self.resetting.store(false, Ordering::SeqCst);
    }
}

/// Installed by attach. Dropping the guard removes everything it registered.
pub struct RootGuard {
    page: Weak<Page>,
    observer: ListenerId,
    lifecycle: ListenerId,
    state: Arc<GuardState>,
}

impl RootGuard {
    pub fn install(
        page: &Arc<Page>,
        container_id: impl Into<String>,
        reset: Arc<dyn ResetToFresh>,
        events: EventEmitter,
    ) -> Self {
        let state = Arc::new(GuardState {
            container_id: container_id.into(),
            reset,
            resetting: AtomicBool::new(false),
            corrections: AtomicUsize::new(0),
            events,
        });

        let observer = {
            let state = Arc::clone(&state);
            page.observe_mutations(move |page| state.check(page))
        };
        let lifecycle = {
            let state = Arc::clone(&state);
            page.add_lifecycle_listener(move |page, event| {
                if event.is_restore_signal() {
                    state.check(page);
                }
            })
        };
        tracing::debug!(container_id = %state.container_id, "Root guard installed");

        state.check(page);
        Self {
            page: Arc::downgrade(page),
            observer,
            lifecycle,
            state,
        }
    }

    /// Run the check now
    pub fn check(&self) {
        if let Some(page) = self.page.upgrade() {
            self.state.check(&page);
        }
    }

    /// How many times the guard has reset the container
    pub fn corrections(&self) -> usize {
        self.state.corrections.load(Ordering::SeqCst)
    }

    pub fn container_id(&self) -> &str {
        &self.state.container_id
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.upgrade() {
            page.disconnect_observer(self.observer);
            page.remove_lifecycle_listener(self.lifecycle);
        }
        tracing::debug!(container_id = %self.state.container_id, "Root guard removed");
    }
}

impl std::fmt::Debug for RootGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootGuard")
            .field("container_id", &self.state.container_id)
            .field("corrections", &self.corrections())
            .finish()
    }
}
