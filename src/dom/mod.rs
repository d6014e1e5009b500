//! In-memory document model
//!
//! This module provides the small slice of a browser document the prepaint
//! pipeline touches: an element tree with ordered attributes, a fragment
//! parser for restoring serialized markup, and an HTML serializer.

mod document;
mod node;
mod parse;

pub use document::Document;
pub use node::{escape_attribute, escape_text, Element, Node};
pub use parse::{parse_fragment, ParseError};
