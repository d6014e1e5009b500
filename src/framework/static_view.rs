//! Markup framework that renders a fixed element tree.
//!
//! Hydration compares the container's markup against the tree it would
//! render and reports the first difference with the same wording React
//! uses, so the mismatch classifier sees realistic input.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{ErrorSink, Framework, FrameworkError};
use crate::dom::{Element, Node};

/// Counters shared between a `StaticFramework` and whoever inspects it
#[derive(Debug, Default)]
pub struct FrameworkStats {
    hydrations: AtomicUsize,
    renders: AtomicUsize,
    unmounts: AtomicUsize,
}

impl FrameworkStats {
    pub fn hydrations(&self) -> usize {
        self.hydrations.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn unmounts(&self) -> usize {
        self.unmounts.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
pub struct StaticFramework {
    stats: Arc<FrameworkStats>,
    defer_reports: bool,
    deferred: Vec<(ErrorSink, String)>,
}

impl StaticFramework {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report mismatches after first paint instead of during `hydrate`
    pub fn with_deferred_reports(mut self) -> Self {
        self.defer_reports = true;
        self
    }

    pub fn stats(&self) -> Arc<FrameworkStats> {
        self.stats.clone()
    }
}

impl Framework for StaticFramework {
    type View = Element;

    fn hydrate(
        &mut self,
        container: &mut Element,
        view: &Element,
        errors: ErrorSink,
    ) -> Result<(), FrameworkError> {
        self.stats.hydrations.fetch_add(1, Ordering::SeqCst);

        let mismatch = match container.first_element_child() {
            Some(existing) => first_mismatch(existing, view),
            None => Some(structure_message(&view.tag, &container.tag)),
        };

        if let Some(message) = mismatch {
            if self.defer_reports {
                self.deferred.push((errors, message));
            } else {
                errors.report(message);
            }
        }
        Ok(())
    }

    fn render(&mut self, container: &mut Element, view: &Element) -> Result<(), FrameworkError> {
        self.stats.renders.fetch_add(1, Ordering::SeqCst);
        container.clear_children();
        container.append_child(view.clone());
        Ok(())
    }

    fn unmount(&mut self, container: &mut Element) {
        self.stats.unmounts.fetch_add(1, Ordering::SeqCst);
        container.clear_children();
    }

    fn after_paint(&mut self) {
        for (sink, message) in self.deferred.drain(..) {
            sink.report(message);
        }
    }
}

fn structure_message(expected: &str, parent: &str) -> String {
    format!(
        "Hydration failed because the initial UI does not match what was rendered on the server. \
         Expected server HTML to contain a matching <{}> in <{}>.",
        expected, parent
    )
}

/// Nodes that take part in comparison; whitespace-only text is layout noise
fn significant(children: &[Node]) -> Vec<&Node> {
    children
        .iter()
        .filter(|node| !matches!(node, Node::Text(text) if text.trim().is_empty()))
        .collect()
}

fn first_mismatch(server: &Element, client: &Element) -> Option<String> {
    if server.tag != client.tag {
        return Some(structure_message(&client.tag, &server.tag));
    }

    for (name, value) in &client.attributes {
        match server.attr(name) {
            Some(existing) if existing == value => {}
            existing => {
                return Some(format!(
                    "Prop `{}` did not match. Server: \"{}\" Client: \"{}\"",
                    name,
                    existing.unwrap_or_default(),
                    value
                ));
            }
        }
    }
    if let Some((name, _)) = server
        .attributes
        .iter()
        .find(|(name, _)| !client.has_attr(name))
    {
        return Some(format!("Extra attributes from the server: {}", name));
    }

    let server_children = significant(&server.children);
    let client_children = significant(&client.children);
    if server_children.len() != client_children.len() {
        return Some(format!(
            "Hydration failed because the initial UI does not match what was rendered on the server. \
             Did not expect server HTML to contain {} children in <{}>, expected {}.",
            server_children.len(),
            server.tag,
            client_children.len()
        ));
    }

    for (server_child, client_child) in server_children.into_iter().zip(client_children) {
        let mismatch = match (server_child, client_child) {
            (Node::Text(a), Node::Text(b)) if a != b => Some(format!(
                "Text content does not match server-rendered HTML. Server: \"{}\" Client: \"{}\"",
                a, b
            )),
            (Node::Text(_), Node::Text(_)) => None,
            (Node::Element(a), Node::Element(b)) => first_mismatch(a, b),
            (_, Node::Element(b)) => Some(structure_message(&b.tag, &server.tag)),
            (_, Node::Text(_)) => Some(format!(
                "Hydration failed because the initial UI does not match what was rendered on the server. \
                 Expected server HTML to contain matching text in <{}>.",
                server.tag
            )),
        };
        if mismatch.is_some() {
            return mismatch;
        }
    }

    None
}
