//! Page lifecycle signals and listener bookkeeping

use std::sync::Arc;

use super::Page;

/// Signals the page emits over its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Document became hidden (tab switch, minimize)
    VisibilityHidden,
    /// Document became visible again
    VisibilityVisible,
    /// Page is being hidden, possibly into the back/forward cache
    PageHide { persisted: bool },
    /// Page was shown, `persisted` when restored from the back/forward cache
    PageShow { persisted: bool },
    /// Page is about to unload
    BeforeUnload,
    /// Back/forward history navigation
    PopState,
}

impl LifecycleEvent {
    /// Signals after which the current view may never be seen again
    pub fn is_capture_signal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::VisibilityHidden
                | LifecycleEvent::PageHide { .. }
                | LifecycleEvent::BeforeUnload
        )
    }

    /// Signals after which stale container state tends to resurface
    pub fn is_restore_signal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::VisibilityVisible
                | LifecycleEvent::PageShow { .. }
                | LifecycleEvent::PopState
        )
    }
}

/// Handle for removing a registered listener or observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub type LifecycleListener = Arc<dyn Fn(&Page, &LifecycleEvent) + Send + Sync>;
pub type MutationObserver = Arc<dyn Fn(&Page) + Send + Sync>;

/// Ordered listener list; callbacks are cloned out before invocation so a
/// callback may add or remove listeners.
pub(crate) struct Registry<T> {
    entries: Vec<(ListenerId, T)>,
}

impl<T: Clone> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, id: ListenerId, value: T) {
        self.entries.push((id, value));
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.entries.iter().map(|(_, value)| value.clone()).collect()
    }
}
