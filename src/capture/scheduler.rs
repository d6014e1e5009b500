//! Lifecycle-triggered capture scheduling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::Prepaint;
use crate::page::{ListenerId, Page};

/// Capture bookkeeping owned by a `Prepaint` context
#[derive(Default)]
pub(crate) struct CaptureState {
    registration: Mutex<Option<Arc<CaptureRegistration>>>,
    scheduled: AtomicBool,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

struct CaptureRegistration {
    page: Weak<Page>,
    listener: ListenerId,
    removed: AtomicBool,
}

impl CaptureRegistration {
    fn remove(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(page) = self.page.upgrade() {
            page.remove_lifecycle_listener(self.listener);
        }
    }
}

/// Returned by [`Prepaint::setup_capture`]. Cleanup from any handle removes
/// the shared listeners.
pub struct CaptureHandle {
    registration: Arc<CaptureRegistration>,
    prepaint: Weak<Prepaint>,
    installed: bool,
}

impl CaptureHandle {
    /// Whether the call that produced this handle installed the listeners
    pub fn installed(&self) -> bool {
        self.installed
    }

    pub fn cleanup(self) {
        self.registration.remove();
        if let Some(prepaint) = self.prepaint.upgrade() {
            let mut slot = prepaint.capture.registration.lock();
            if slot
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, &self.registration))
            {
                *slot = None;
            }
        }
        tracing::debug!("Capture listeners removed");
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("listener", &self.registration.listener)
            .field("installed", &self.installed)
            .finish()
    }
}

impl Prepaint {
    /// Capture on page-hidden, page-hide and before-unload signals.
    ///
    /// Idempotent: a second call returns a handle to the same listeners.
    pub fn setup_capture(self: &Arc<Self>, page: &Arc<Page>) -> CaptureHandle {
        let mut slot = self.capture.registration.lock();
        if let Some(existing) = slot.as_ref() {
            tracing::debug!("Capture already set up");
            return CaptureHandle {
                registration: Arc::clone(existing),
                prepaint: Arc::downgrade(self),
                installed: false,
            };
        }

        let prepaint = Arc::downgrade(self);
        let weak_page = Arc::downgrade(page);
        let listener = page.add_lifecycle_listener(move |_, event| {
            if !event.is_capture_signal() {
                return;
            }
            if let (Some(prepaint), Some(page)) = (prepaint.upgrade(), weak_page.upgrade()) {
                prepaint.schedule_capture(page);
            }
        });

        let registration = Arc::new(CaptureRegistration {
            page: Arc::downgrade(page),
            listener,
            removed: AtomicBool::new(false),
        });
        *slot = Some(Arc::clone(&registration));
        tracing::debug!(route = %page.route(), "Capture listeners installed");

        CaptureHandle {
            registration,
            prepaint: Arc::downgrade(self),
            installed: true,
        }
    }

    /// Schedule one asynchronous capture. Signals arriving before the
    /// scheduled task starts are folded into it. Returns whether a new task
    /// was spawned.
    pub fn schedule_capture(self: Arc<Self>, page: Arc<Page>) -> bool {
        if self.capture.scheduled.swap(true, Ordering::SeqCst) {
            tracing::trace!("Capture already scheduled");
            return false;
        }

        let Ok(runtime) = Handle::try_current() else {
            self.capture.scheduled.store(false, Ordering::SeqCst);
            tracing::debug!("No async runtime; capture skipped");
            return false;
        };

        let prepaint = Arc::clone(&self);
        let task = runtime.spawn(async move {
            prepaint.capture.scheduled.store(false, Ordering::SeqCst);
            prepaint.capture_snapshot(&page).await;
        });

        let mut pending = self.capture.pending.lock();
        pending.retain(|task| !task.is_finished());
        pending.push(task);
        true
    }

    /// Wait until every scheduled capture has finished
    pub async fn wait_for_pending_capture(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.capture.pending.lock());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    tracing::warn!(error = %e, "Capture task failed");
                }
            }
        }
    }
}
