//! Hydration mismatch classification.
//!
//! Frameworks report mismatches as free-form text. The rules here are a
//! best-effort heuristic over that text: wording changes between framework
//! releases land in `MismatchKind::Unknown` rather than a wrong category.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MismatchKind {
    /// Text differs between restored and live markup
    Content,
    /// An attribute or prop differs
    Attribute,
    /// Elements are missing, extra, or of a different type
    Structure,
    Unknown,
}

impl MismatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchKind::Content => "content",
            MismatchKind::Attribute => "attribute",
            MismatchKind::Structure => "structure",
            MismatchKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind} mismatch during hydration: {message}")]
pub struct HydrationError {
    pub kind: MismatchKind,
    pub message: String,
}

impl HydrationError {
    pub fn new(kind: MismatchKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a framework error message
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind: classify_mismatch(&message),
            message,
        }
    }
}

/// Ordered rules; the first match wins. Content and attribute rules come
/// before structure because frameworks often prefix specific messages with
/// a generic "hydration failed" sentence.
fn rules() -> &'static [(MismatchKind, Regex)] {
    static RULES: OnceLock<Vec<(MismatchKind, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        let raw = [
            (
                MismatchKind::Content,
                r"(?i)text content (does|did) not match|hydration text mismatch|text content mismatch",
            ),
            (
                MismatchKind::Attribute,
                r"(?i)prop `[^`]*` did not match|extra attributes? from the server|attributes? (does|did) not match",
            ),
            (
                MismatchKind::Structure,
                r"(?i)initial ui does not match|expected server html to contain|did not expect server html|hydration failed|error while hydrating",
            ),
        ];
        raw.into_iter()
            .filter_map(|(kind, pattern)| Regex::new(pattern).ok().map(|re| (kind, re)))
            .collect()
    })
}

/// Best-effort classification of a mismatch message
pub fn classify_mismatch(message: &str) -> MismatchKind {
    rules()
        .iter()
        .find(|(_, re)| re.is_match(message))
        .map(|(kind, _)| *kind)
        .unwrap_or(MismatchKind::Unknown)
}
