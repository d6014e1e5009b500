//! The declarative UI framework seam.
//!
//! The pipeline needs exactly two primitives from a framework: attach to
//! markup that is already in the container, and render fresh into it.
//! Recoverable problems found while attaching are reported through an
//! [`ErrorSink`] instead of being returned.

mod static_view;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::dom::Element;

pub use static_view::{FrameworkStats, StaticFramework};

/// A recoverable problem reported by the framework while attaching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverableError {
    pub message: String,
}

/// Where a framework reports recoverable attach errors.
///
/// Clones report into the same channel. Reports made after the attach
/// operation finished are dropped.
#[derive(Debug, Clone)]
pub struct ErrorSink {
    tx: mpsc::UnboundedSender<RecoverableError>,
}

impl ErrorSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RecoverableError>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn report(&self, message: impl Into<String>) {
        let error = RecoverableError {
            message: message.into(),
        };
        if self.tx.send(error).is_err() {
            tracing::debug!("Recoverable error reported after attach finished");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Unrecoverable framework failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    #[error("Hydration aborted: {0}")]
    Hydrate(String),
    #[error("Render failed: {0}")]
    Render(String),
    #[error("Render container #{0} not found")]
    MissingContainer(String),
}

pub trait Framework: Send + 'static {
    /// What the framework renders, e.g. a component tree
    type View: Clone + Send + Sync + 'static;

    /// Adopt the markup already inside `container`
    fn hydrate(
        &mut self,
        container: &mut Element,
        view: &Self::View,
        errors: ErrorSink,
    ) -> Result<(), FrameworkError>;

    /// Render `view` into an empty `container`
    fn render(&mut self, container: &mut Element, view: &Self::View) -> Result<(), FrameworkError>;

    /// Tear down whatever is mounted in `container`
    fn unmount(&mut self, container: &mut Element);

    /// Called once after the first paint following `hydrate`
    fn after_paint(&mut self) {}
}
