//! The page a prepaint pipeline runs in.
//!
//! `Page` owns the document, the current location, the lifecycle event bus,
//! and mutation observation. All document changes go through
//! [`Page::mutate`]; observers run after the change has been applied and the
//! document lock released, so observation is level-triggered.

mod lifecycle;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::Url;

use crate::dom::Document;

pub use lifecycle::{LifecycleEvent, LifecycleListener, ListenerId, MutationObserver};
use lifecycle::Registry;

/// Runtime primitive for animating a DOM update.
///
/// Implementations must invoke `update` exactly once. If they do not, the
/// update is applied directly afterwards.
pub trait ViewTransitions: Send + Sync {
    fn start(&self, update: &mut dyn FnMut());
}

pub struct Page {
    location: RwLock<Url>,
    document: Mutex<Document>,
    lifecycle: Mutex<Registry<LifecycleListener>>,
    observers: Mutex<Registry<MutationObserver>>,
    transitions: Option<Arc<dyn ViewTransitions>>,
    next_listener: AtomicU64,
}

impl Page {
    pub fn new(location: Url) -> Self {
        Self {
            location: RwLock::new(location),
            document: Mutex::new(Document::new()),
            lifecycle: Mutex::new(Registry::new()),
            observers: Mutex::new(Registry::new()),
            transitions: None,
            next_listener: AtomicU64::new(1),
        }
    }

    pub fn with_document(mut self, document: Document) -> Self {
        self.document = Mutex::new(document);
        self
    }

    pub fn with_transitions(mut self, transitions: Arc<dyn ViewTransitions>) -> Self {
        self.transitions = Some(transitions);
        self
    }

    pub fn location(&self) -> Url {
        self.location.read().clone()
    }

    /// Snapshot identity for the current location
    pub fn route(&self) -> String {
        self.location.read().path().to_string()
    }

    /// Change the current location without touching the document
    pub fn navigate(&self, location: Url) {
        *self.location.write() = location;
    }

    /// Read the document
    pub fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let document = self.document.lock();
        f(&document)
    }

    /// Change the document, then notify mutation observers
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let result = {
            let mut document = self.document.lock();
            f(&mut document)
        };
        let observers = self.observers.lock().snapshot();
        for observer in observers {
            observer(self);
        }
        result
    }

    /// Serialized document
    pub fn html(&self) -> String {
        self.read(Document::to_html)
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed))
    }

    pub fn add_lifecycle_listener(
        &self,
        listener: impl Fn(&Page, &LifecycleEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = self.next_id();
        self.lifecycle.lock().insert(id, Arc::new(listener));
        id
    }

    pub fn remove_lifecycle_listener(&self, id: ListenerId) -> bool {
        self.lifecycle.lock().remove(id)
    }

    pub fn lifecycle_listener_count(&self) -> usize {
        self.lifecycle.lock().len()
    }

    pub fn observe_mutations(&self, observer: impl Fn(&Page) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id();
        self.observers.lock().insert(id, Arc::new(observer));
        id
    }

    pub fn disconnect_observer(&self, id: ListenerId) -> bool {
        self.observers.lock().remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().len()
    }

    /// Deliver a lifecycle signal to every listener, in registration order
    pub fn dispatch(&self, event: LifecycleEvent) {
        tracing::trace!(?event, "Dispatching lifecycle event");
        let listeners = self.lifecycle.lock().snapshot();
        for listener in listeners {
            listener(self, &event);
        }
    }

    pub fn transitions(&self) -> Option<Arc<dyn ViewTransitions>> {
        self.transitions.clone()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("location", &self.location.read().as_str())
            .field("lifecycle_listeners", &self.lifecycle_listener_count())
            .field("observers", &self.observer_count())
            .finish()
    }
}
