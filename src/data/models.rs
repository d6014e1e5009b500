//! Data models for persisted snapshots

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Snapshots older than this are never restored
pub const MAX_SNAPSHOT_AGE_DAYS: i64 = 7;

/// One style source captured alongside a snapshot, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StyleRecord {
    /// Literal text of a `<style>` element
    Inline { text: String },
    /// A linked stylesheet by absolute URL, with its text when it could be fetched
    External {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl StyleRecord {
    pub fn inline(text: impl Into<String>) -> Self {
        StyleRecord::Inline { text: text.into() }
    }

    pub fn external(href: impl Into<String>, content: Option<String>) -> Self {
        StyleRecord::External {
            href: href.into(),
            content,
        }
    }

    /// Text that will be injected as a `<style>` body, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            StyleRecord::Inline { text } => Some(text),
            StyleRecord::External { content, .. } => content.as_deref(),
        }
    }
}

/// The last-rendered markup of one route plus its active styling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Identity key; one snapshot per route
    pub route: String,
    /// Serialized markup of the container's first child
    pub body: String,
    /// When the snapshot was captured
    pub timestamp: DateTime<Utc>,
    pub styles: Vec<StyleRecord>,
}

impl Snapshot {
    pub fn new(
        route: impl Into<String>,
        body: impl Into<String>,
        timestamp: DateTime<Utc>,
        styles: Vec<StyleRecord>,
    ) -> Self {
        Self {
            route: route.into(),
            body: body.into(),
            timestamp,
            styles,
        }
    }

    /// Age of the snapshot at `now`. Timestamps in the future count as age zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let age = now - self.timestamp;
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }

    /// Whether the snapshot may still be restored. The boundary is inclusive.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        self.age(now) <= max_age
    }

    /// SHA-256 over body and styles, used to skip rewriting unchanged content
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.body.as_bytes());
        for style in &self.styles {
            match style {
                StyleRecord::Inline { text } => {
                    hasher.update(b"\0inline\0");
                    hasher.update(text.as_bytes());
                }
                StyleRecord::External { href, content } => {
                    hasher.update(b"\0external\0");
                    hasher.update(href.as_bytes());
                    if let Some(content) = content {
                        hasher.update(b"\0");
                        hasher.update(content.as_bytes());
                    }
                }
            }
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Listing entry for a stored snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotSummary {
    pub route: String,
    pub timestamp: DateTime<Utc>,
    pub body_bytes: usize,
    pub style_count: usize,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            route: snapshot.route.clone(),
            timestamp: snapshot.timestamp,
            body_bytes: snapshot.body.len(),
            style_count: snapshot.styles.len(),
        }
    }
}
