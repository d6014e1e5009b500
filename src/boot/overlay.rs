//! Overlay layer: an isolated, non-interactive copy of the snapshot painted
//! above the container, which stays empty for the framework.

use crate::dom::{Document, Element, Node};

pub const OVERLAY_ID: &str = "prepaint-overlay";

const OVERLAY_STYLE: &str =
    "position:fixed;inset:0;z-index:2147483647;pointer-events:none;overflow:hidden";

fn overlay_layer(nodes: Vec<Node>) -> Element {
    let mut layer = Element::new("div")
        .with_attr("id", OVERLAY_ID)
        .with_attr("aria-hidden", "true")
        .with_attr("inert", "")
        .with_attr("style", OVERLAY_STYLE);
    layer.children = nodes;
    layer
}

/// Paint `nodes` into a fresh overlay layer, replacing any previous one
pub(crate) fn paint(document: &mut Document, nodes: Vec<Node>) {
    remove(document);
    document.body_mut().append_child(overlay_layer(nodes));
}

/// Remove the overlay layer. Returns whether one was present.
pub(crate) fn remove(document: &mut Document) -> bool {
    document
        .body_mut()
        .remove_descendants(&|el| el.id() == Some(OVERLAY_ID))
        > 0
}
