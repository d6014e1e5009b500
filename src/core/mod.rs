//! Core module containing the shared prepaint context.
//!
//! This module provides the pieces every phase of the pipeline uses:
//! - The `Prepaint` context object (config, store opener, clock, guards)
//! - The phase error taxonomy
//! - Typed observability events

mod error;
mod events;
mod prepaint_core;

pub use error::{BootError, CaptureError, PrepaintError};
pub use events::{EventCategory, EventEmitter, ObservabilityEvent};
pub use prepaint_core::Prepaint;
