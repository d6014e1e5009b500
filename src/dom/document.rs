//! Document root with head and body

use super::node::{Element, Node};

/// A document: the root `<html>` element plus its head and body.
///
/// Root attributes live on `element`; head and body are held separately so
/// they always exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    element: Element,
    head: Element,
    body: Element,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self {
            element: Element::new("html"),
            head: Element::new("head"),
            body: Element::new("body"),
        }
    }

    /// Create a document whose body holds one empty container element
    pub fn with_container(container_id: &str) -> Self {
        let mut doc = Self::new();
        doc.body
            .append_child(Element::new("div").with_attr("id", container_id));
        doc
    }

    /// The root `<html>` element (attributes only; head and body are separate)
    pub fn root(&self) -> &Element {
        &self.element
    }

    pub fn root_attr(&self, name: &str) -> Option<&str> {
        self.element.attr(name)
    }

    pub fn set_root_attr(&mut self, name: &str, value: impl Into<String>) {
        self.element.set_attr(name, value);
    }

    pub fn remove_root_attr(&mut self, name: &str) -> Option<String> {
        self.element.remove_attr(name)
    }

    pub fn head(&self) -> &Element {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut Element {
        &mut self.head
    }

    pub fn body(&self) -> &Element {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Element {
        &mut self.body
    }

    /// Find an element by id in head or body
    pub fn element_by_id(&self, id: &str) -> Option<&Element> {
        self.head
            .find_by_id(id)
            .or_else(|| self.body.find_by_id(id))
    }

    pub fn element_by_id_mut(&mut self, id: &str) -> Option<&mut Element> {
        if self.head.find_by_id(id).is_some() {
            return self.head.find_by_id_mut(id);
        }
        self.body.find_by_id_mut(id)
    }

    /// Remove every element in head and body matching `predicate`
    pub fn remove_elements(&mut self, predicate: &dyn Fn(&Element) -> bool) -> usize {
        self.head.remove_descendants(predicate) + self.body.remove_descendants(predicate)
    }

    /// Serialize the full document
    pub fn to_html(&self) -> String {
        let mut html = self.element.clone();
        html.children = vec![
            Node::Element(self.head.clone()),
            Node::Element(self.body.clone()),
        ];
        format!("<!doctype html>{}", html.outer_html())
    }
}
