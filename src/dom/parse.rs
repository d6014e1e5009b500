//! Fragment parser for serialized snapshot markup
//!
//! The parser accepts the markup this crate serializes plus common
//! hand-written variations: quoted, unquoted and boolean attributes,
//! void elements with or without `/>`, comments and doctypes (dropped),
//! raw-text `script`/`style` bodies, and character references. Unclosed
//! elements are closed at end of input; a closing tag that does not match
//! the innermost open element is an error rather than a silent repair.

use thiserror::Error;

use super::node::{Element, Node, RAW_TEXT_ELEMENTS};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),
    #[error("Unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),
    #[error("Unterminated attribute value starting at byte {0}")]
    UnterminatedAttribute(usize),
    #[error("Closing tag </{found}> does not match open <{expected}>")]
    MismatchedClose { expected: String, found: String },
    #[error("Closing tag </{0}> has no matching open tag")]
    UnexpectedClose(String),
}

/// Parse an HTML fragment into a list of top-level nodes
pub fn parse_fragment(input: &str) -> Result<Vec<Node>, ParseError> {
    let mut parser = Parser { input, pos: 0 };
    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();

    while parser.pos < input.len() {
        let rest = parser.rest();
        if rest.starts_with("<!--") {
            parser.skip_comment()?;
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            parser.skip_declaration()?;
        } else if rest.starts_with("</") {
            let name = parser.parse_close_tag()?;
            let Some(open) = stack.pop() else {
                return Err(ParseError::UnexpectedClose(name));
            };
            if open.tag != name {
                return Err(ParseError::MismatchedClose {
                    expected: open.tag,
                    found: name,
                });
            }
            push_node(&mut stack, &mut roots, Node::Element(open));
        } else if starts_tag(rest) {
            let (mut element, self_closing) = parser.parse_open_tag()?;
            if element.is_void() || self_closing {
                push_node(&mut stack, &mut roots, Node::Element(element));
            } else if RAW_TEXT_ELEMENTS.contains(&element.tag.as_str()) {
                let text = parser.take_raw_text(&element.tag)?;
                if !text.is_empty() {
                    element.children.push(Node::Text(text));
                }
                push_node(&mut stack, &mut roots, Node::Element(element));
            } else {
                stack.push(element);
            }
        } else {
            let text = parser.take_text();
            push_node(&mut stack, &mut roots, Node::Text(decode_entities(text)));
        }
    }

    // Close anything still open at end of input
    while let Some(open) = stack.pop() {
        push_node(&mut stack, &mut roots, Node::Element(open));
    }

    Ok(roots)
}

fn push_node(stack: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    let siblings = match stack.last_mut() {
        Some(parent) => &mut parent.children,
        None => roots,
    };
    if let (Node::Text(text), Some(Node::Text(prev))) = (&node, siblings.last_mut()) {
        prev.push_str(text);
        return;
    }
    siblings.push(node);
}

fn starts_tag(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match self.rest()[4..].find("-->") {
            Some(end) => {
                self.pos += 4 + end + 3;
                Ok(())
            }
            None => Err(ParseError::UnterminatedComment(start)),
        }
    }

    fn skip_declaration(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        match self.rest().find('>') {
            Some(end) => {
                self.pos += end + 1;
                Ok(())
            }
            None => Err(ParseError::UnterminatedTag(start)),
        }
    }

    fn take_name(&mut self) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn parse_close_tag(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 2;
        let name = self.take_name().to_ascii_lowercase();
        self.skip_whitespace();
        if !self.rest().starts_with('>') {
            return Err(ParseError::UnterminatedTag(start));
        }
        self.pos += 1;
        Ok(name)
    }

    fn parse_open_tag(&mut self) -> Result<(Element, bool), ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut element = Element::new(self.take_name());

        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(ParseError::UnterminatedTag(start));
            }
            if rest.starts_with("/>") {
                self.pos += 2;
                return Ok((element, true));
            }
            if rest.starts_with('>') {
                self.pos += 1;
                return Ok((element, false));
            }
            if rest.starts_with('/') {
                self.pos += 1;
                continue;
            }

            let name_len = rest
                .find(|c: char| c.is_whitespace() || matches!(c, '=' | '>' | '/'))
                .unwrap_or(rest.len());
            if name_len == 0 {
                // Stray character such as a lone quote; skip it
                self.pos += rest.chars().next().map_or(1, char::len_utf8);
                continue;
            }
            let name = rest[..name_len].to_ascii_lowercase();
            self.pos += name_len;

            self.skip_whitespace();
            let value = if self.rest().starts_with('=') {
                self.pos += 1;
                self.skip_whitespace();
                self.parse_attribute_value()?
            } else {
                String::new()
            };
            if !element.has_attr(&name) {
                element.attributes.push((name, value));
            }
        }
    }

    fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let rest = self.rest();
        match rest.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let body = &rest[1..];
                let end = body
                    .find(quote)
                    .ok_or(ParseError::UnterminatedAttribute(start))?;
                self.pos += end + 2;
                Ok(decode_entities(&body[..end]))
            }
            _ => {
                let len = rest
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(rest.len());
                self.pos += len;
                Ok(decode_entities(&rest[..len]))
            }
        }
    }

    fn take_raw_text(&mut self, tag: &str) -> Result<String, ParseError> {
        let start = self.pos;
        let rest = self.rest();
        let closing = format!("</{}", tag);
        let end = rest
            .to_ascii_lowercase()
            .find(&closing)
            .ok_or(ParseError::UnterminatedTag(start))?;
        let text = rest[..end].to_string();
        self.pos += end;
        self.parse_close_tag()?;
        Ok(text)
    }

    fn take_text(&mut self) -> &'a str {
        let rest = self.rest();
        // A '<' that does not open a tag is literal text
        let search_from = if rest.starts_with('<') { 1 } else { 0 };
        let len = rest[search_from..]
            .find('<')
            .map_or(rest.len(), |i| i + search_from);
        self.pos += len;
        &rest[..len]
    }
}

/// Decode the character references the serializer and common markup produce
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            decode_entity(entity).map(|ch| (ch, end + 1))
        });
        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
