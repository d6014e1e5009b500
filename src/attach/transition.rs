//! Wrapping DOM updates in the page's transition primitive

use crate::page::ViewTransitions;

/// Run `update` inside `transitions` when available. The update is applied
/// exactly once whether or not the primitive invokes it.
pub(crate) fn run_update(transitions: Option<&dyn ViewTransitions>, update: &mut dyn FnMut()) {
    let mut applied = false;
    if let Some(transitions) = transitions {
        let mut once = || {
            if !applied {
                applied = true;
                update();
            }
        };
        transitions.start(&mut once);
    }
    if !applied {
        update();
    }
}
