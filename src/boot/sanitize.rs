//! Sanitizing hook for restored markup.
//!
//! Snapshots are restored from local storage that other scripts on the same
//! origin can write. When a sanitizer is configured it runs on every restore,
//! so content persisted before the sanitizer existed is covered too.

use crate::dom::{Element, Node};

pub trait Sanitizer: Send + Sync {
    fn sanitize(&self, nodes: &mut Vec<Node>);
}

/// Removes executable content: script-like elements, inline event handlers
/// and `javascript:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptStripper;

const EXECUTABLE_ELEMENTS: &[&str] = &["script", "iframe", "object", "embed"];
const URL_ATTRIBUTES: &[&str] = &["href", "src", "action", "formaction", "xlink:href"];

fn is_executable(el: &Element) -> bool {
    EXECUTABLE_ELEMENTS.contains(&el.tag.as_str())
}

fn strip_attributes(el: &mut Element) {
    el.attributes.retain(|(name, value)| {
        if name.starts_with("on") {
            return false;
        }
        if URL_ATTRIBUTES.contains(&name.as_str()) {
            let normalized: String = value
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            return !normalized.starts_with("javascript:");
        }
        true
    });
}

impl Sanitizer for ScriptStripper {
    fn sanitize(&self, nodes: &mut Vec<Node>) {
        nodes.retain(|node| !node.as_element().is_some_and(is_executable));
        for el in nodes.iter_mut().filter_map(Node::as_element_mut) {
            el.remove_descendants(&is_executable);
            el.for_each_element_mut(&mut strip_attributes);
        }
    }
}
