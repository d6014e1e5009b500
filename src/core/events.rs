//! Typed observability events.
//!
//! Every capture, restore, handoff decision, hydration error and storage
//! error is published to an optional broadcast channel. Nobody listening is
//! a silent no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventCategory {
    Capture,
    Restore,
    Handoff,
    Hydration,
    Storage,
    Guard,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Capture => "capture",
            EventCategory::Restore => "restore",
            EventCategory::Handoff => "handoff",
            EventCategory::Hydration => "hydration",
            EventCategory::Storage => "storage",
            EventCategory::Guard => "guard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityEvent {
    pub id: Uuid,
    pub category: EventCategory,
    /// Event type within the category, e.g. `snapshot-saved`
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

/// Publishes events to subscribers, if any
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: Option<broadcast::Sender<ObservabilityEvent>>,
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: Some(sender),
        }
    }

    /// An emitter that only logs
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<ObservabilityEvent>> {
        self.sender.as_ref().map(|s| s.subscribe())
    }

    pub fn emit(&self, category: EventCategory, kind: &str, payload: serde_json::Value) {
        tracing::debug!(
            category = category.as_str(),
            kind,
            payload = %payload,
            "prepaint event"
        );

        let Some(sender) = &self.sender else {
            return;
        };
        let event = ObservabilityEvent {
            id: Uuid::now_v7(),
            category,
            kind: kind.to_string(),
            timestamp: Utc::now(),
            payload,
        };
        // No receivers is not an error
        let _ = sender.send(event);
    }
}
