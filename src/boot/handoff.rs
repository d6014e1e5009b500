//! Restore metadata on the document root and the handoff query

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dom::Document;

pub const STRATEGY_ATTR: &str = "data-prepaint-strategy";
pub const TIMESTAMP_ATTR: &str = "data-prepaint-timestamp";
pub const OVERLAY_ATTR: &str = "data-prepaint-overlay";

/// Whether a snapshot was painted before the framework loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    HasPrepaint,
    ColdStart,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::HasPrepaint => "has-prepaint",
            Strategy::ColdStart => "cold-start",
        }
    }
}

/// Read the restore strategy from the document. Pure and synchronous.
pub fn handoff(document: &Document) -> Strategy {
    match document.root_attr(STRATEGY_ATTR) {
        Some(value) if value == Strategy::HasPrepaint.as_str() => Strategy::HasPrepaint,
        _ => Strategy::ColdStart,
    }
}

/// Markers written on the document root by the restorer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreMetadata {
    /// Capture time of the painted snapshot
    pub timestamp: DateTime<Utc>,
    /// Painted into the overlay layer instead of the container
    pub overlay: bool,
}

impl RestoreMetadata {
    pub fn write(&self, document: &mut Document) {
        document.set_root_attr(STRATEGY_ATTR, Strategy::HasPrepaint.as_str());
        document.set_root_attr(TIMESTAMP_ATTR, self.timestamp.timestamp_millis().to_string());
        if self.overlay {
            document.set_root_attr(OVERLAY_ATTR, "true");
        } else {
            document.remove_root_attr(OVERLAY_ATTR);
        }
    }

    /// Metadata currently on the document, if a restore happened
    pub fn read(document: &Document) -> Option<Self> {
        if handoff(document) != Strategy::HasPrepaint {
            return None;
        }
        let timestamp = document
            .root_attr(TIMESTAMP_ATTR)
            .and_then(|raw| raw.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)?;
        Some(Self {
            timestamp,
            overlay: document.root_attr(OVERLAY_ATTR) == Some("true"),
        })
    }

    /// Remove every restore marker. Returns whether any were present.
    pub fn clear(document: &mut Document) -> bool {
        [STRATEGY_ATTR, TIMESTAMP_ATTR, OVERLAY_ATTR]
            .into_iter()
            .fold(false, |removed, attr| {
                document.remove_root_attr(attr).is_some() || removed
            })
    }
}
