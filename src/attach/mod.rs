//! Framework attach and reconciliation.
//!
//! `attach` decides between adopting restored markup and rendering fresh,
//! falls back to a fresh render at most once when adoption reports a
//! mismatch, removes every restore artifact, and installs the root guard.

mod guard;
mod mismatch;
mod transition;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use crate::boot::{handoff, overlay, RestoreMetadata, Strategy};
use crate::capture::STYLE_MARKER_ATTR;
use crate::core::{EventCategory, Prepaint, PrepaintError};
use crate::dom::Element;
use crate::framework::{ErrorSink, Framework, FrameworkError};
use crate::page::{Page, ViewTransitions};

pub use guard::{ResetToFresh, RootGuard};
pub use mismatch::{classify_mismatch, HydrationError, MismatchKind};
use transition::run_update;

pub type HydrationErrorHook = Arc<dyn Fn(&HydrationError) + Send + Sync>;

#[derive(Clone, Default)]
pub struct AttachOptions {
    /// Apply updates directly even when the page offers transitions
    pub disable_transitions: bool,
    /// Called once for every classified hydration error
    pub on_hydration_error: Option<HydrationErrorHook>,
}

impl AttachOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_transitions(mut self) -> Self {
        self.disable_transitions = true;
        self
    }

    pub fn on_hydration_error(
        mut self,
        hook: impl Fn(&HydrationError) + Send + Sync + 'static,
    ) -> Self {
        self.on_hydration_error = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for AttachOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachOptions")
            .field("disable_transitions", &self.disable_transitions)
            .field("on_hydration_error", &self.on_hydration_error.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Restored markup was adopted in place
    Hydrated,
    /// Rendered from scratch without attempting adoption
    FreshRender,
    /// Adoption reported a mismatch; the restored markup was discarded
    RecoveredFromMismatch(HydrationError),
    /// Nothing could be rendered
    Failed(FrameworkError),
}

#[derive(Debug, Clone)]
pub struct AttachReport {
    pub strategy: Strategy,
    pub outcome: AttachOutcome,
    /// Fresh renders performed by this call (the guard's are not counted)
    pub fresh_renders: usize,
    /// Every hydration error reported, in order
    pub hydration_errors: Vec<HydrationError>,
    pub transitions: bool,
}

/// Owns the framework for the page's lifetime and renders it fresh on demand
struct FreshRenderer<F: Framework> {
    framework: Mutex<F>,
    view: F::View,
    container_id: String,
}

impl<F: Framework> FreshRenderer<F> {
    fn missing_container(&self) -> FrameworkError {
        FrameworkError::MissingContainer(self.container_id.clone())
    }

    /// Clear the container and render into it, discarding the previous tree first
    fn render_fresh(&self, page: &Page, discard: bool) -> Result<(), FrameworkError> {
        page.mutate(|doc| {
            let container = doc
                .element_by_id_mut(&self.container_id)
                .ok_or_else(|| self.missing_container())?;
            let mut framework = self.framework.lock();
            if discard {
                framework.unmount(container);
            }
            container.clear_children();
            framework.render(container, &self.view)
        })
    }

    fn hydrate(&self, page: &Page, sink: ErrorSink) -> Result<(), FrameworkError> {
        page.mutate(|doc| {
            let container = doc
                .element_by_id_mut(&self.container_id)
                .ok_or_else(|| self.missing_container())?;
            self.framework.lock().hydrate(container, &self.view, sink)
        })
    }
}

impl<F: Framework> ResetToFresh for FreshRenderer<F> {
    fn reset(&self, page: &Page) {
        if let Err(e) = self.render_fresh(page, true) {
            tracing::warn!(error = %e, "Root guard reset failed");
        }
    }
}

impl Prepaint {
    /// Hand the page to `framework`.
    ///
    /// Adopts restored markup when the handoff says a snapshot was painted
    /// and the container holds exactly one element; otherwise renders fresh.
    /// Replaces any root guard installed by a previous call.
    pub async fn attach<F: Framework>(
        &self,
        page: &Arc<Page>,
        framework: F,
        view: F::View,
        options: AttachOptions,
    ) -> AttachReport {
        if self.uninstall_guard() {
            tracing::debug!("Replaced previous root guard");
        }

        let container_id = self.config().restore.container_id.clone();
        let (strategy, children) = page.read(|doc| {
            (
                handoff(doc),
                doc.element_by_id(&container_id)
                    .map(Element::element_child_count),
            )
        });
        self.events().emit(
            EventCategory::Handoff,
            "decided",
            json!({ "strategy": strategy.as_str(), "container_children": children }),
        );

        let transitions = if options.disable_transitions || !self.config().attach.transitions {
            None
        } else {
            page.transitions()
        };
        let mut report = AttachReport {
            strategy,
            outcome: AttachOutcome::FreshRender,
            fresh_renders: 0,
            hydration_errors: Vec::new(),
            transitions: transitions.is_some(),
        };

        let renderer = Arc::new(FreshRenderer {
            framework: Mutex::new(framework),
            view,
            container_id: container_id.clone(),
        });

        match children {
            None => {
                let error = renderer.missing_container();
                tracing::warn!(error = %error, "Cannot attach");
                report.outcome = AttachOutcome::Failed(error);
            }
            Some(1) if strategy == Strategy::HasPrepaint => {
                let errors = self.adopt(page, &renderer, transitions.as_deref()).await;
                for error in errors {
                    self.report_hydration_error(&error, &options);
                    // Single bailout: only the first error discards the tree
                    if report.hydration_errors.is_empty() {
                        tracing::info!(kind = %error.kind, "Discarding restored markup");
                        report.outcome =
                            match self.fresh_render(page, &renderer, transitions.as_deref(), true) {
                                Ok(()) => {
                                    report.fresh_renders += 1;
                                    AttachOutcome::RecoveredFromMismatch(error.clone())
                                }
                                Err(e) => AttachOutcome::Failed(e),
                            };
                    }
                    report.hydration_errors.push(error);
                }
                if report.hydration_errors.is_empty() {
                    report.outcome = AttachOutcome::Hydrated;
                }
            }
            Some(_) => {
                match self.fresh_render(page, &renderer, transitions.as_deref(), false) {
                    Ok(()) => report.fresh_renders += 1,
                    Err(e) => report.outcome = AttachOutcome::Failed(e),
                }
            }
        }

        self.cleanup_restore(page);

        if let AttachOutcome::Failed(e) = &report.outcome {
            tracing::warn!(error = %e, "Attach failed; root guard not installed");
        } else {
            let guard = RootGuard::install(
                page,
                container_id,
                renderer as Arc<dyn ResetToFresh>,
                self.events().clone(),
            );
            *self.guard.lock() = Some(guard);
        }

        tracing::debug!(
            strategy = strategy.as_str(),
            outcome = ?report.outcome,
            fresh_renders = report.fresh_renders,
            "Attach finished"
        );
        report
    }

    /// Adopt the restored markup, collecting errors reported during
    /// hydration and through the first paint after it
    async fn adopt<F: Framework>(
        &self,
        page: &Page,
        renderer: &FreshRenderer<F>,
        transitions: Option<&dyn ViewTransitions>,
    ) -> Vec<HydrationError> {
        let (sink, mut reports) = ErrorSink::channel();
        let mut result = Ok(());
        run_update(transitions, &mut || {
            result = renderer.hydrate(page, sink.clone());
        });

        tokio::task::yield_now().await;
        renderer.framework.lock().after_paint();
        drop(sink);

        let mut errors = Vec::new();
        while let Ok(report) = reports.try_recv() {
            errors.push(HydrationError::from_message(report.message));
        }
        if let Err(e) = result {
            let message = match e {
                FrameworkError::Hydrate(message) => message,
                other => other.to_string(),
            };
            errors.push(HydrationError::from_message(message));
        }
        errors
    }

    fn fresh_render<F: Framework>(
        &self,
        page: &Page,
        renderer: &FreshRenderer<F>,
        transitions: Option<&dyn ViewTransitions>,
        discard: bool,
    ) -> Result<(), FrameworkError> {
        let mut result = Ok(());
        run_update(transitions, &mut || {
            result = renderer.render_fresh(page, discard);
        });
        result
    }

    fn report_hydration_error(&self, error: &HydrationError, options: &AttachOptions) {
        self.log_failure(&PrepaintError::from(error.clone()), "attach");
        self.events().emit(
            EventCategory::Hydration,
            "mismatch",
            json!({ "kind": error.kind, "message": error.message }),
        );
        if let Some(hook) = &options.on_hydration_error {
            hook(error);
        }
    }

    /// Remove restore metadata, injected styles and the overlay layer
    fn cleanup_restore(&self, page: &Page) {
        let (metadata, styles, overlay) = page.mutate(|doc| {
            (
                RestoreMetadata::clear(doc),
                doc.remove_elements(&|el| el.has_attr(STYLE_MARKER_ATTR)),
                overlay::remove(doc),
            )
        });
        tracing::debug!(metadata, styles, overlay, "Restore artifacts removed");
    }
}
