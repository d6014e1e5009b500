//! Error types for each phase of the pipeline.
//!
//! None of these reach the embedding application. Public operations catch
//! them at their boundary, log them, emit them, and fall back to behaving as
//! if no snapshot existed.

use thiserror::Error;

use crate::attach::HydrationError;
use crate::data::StorageError;
use crate::dom::ParseError;

/// Failures while restoring a snapshot before the framework loads
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    #[error("Failed to open snapshot storage: {0}")]
    StorageOpen(#[source] StorageError),

    #[error("Failed to read snapshot for {route}: {source}")]
    SnapshotRead {
        route: String,
        #[source]
        source: StorageError,
    },

    #[error("Failed to restore snapshot markup: {0}")]
    TreeRestore(#[from] ParseError),

    #[error("Failed to inject snapshot style: {0}")]
    StyleInjection(String),
}

impl BootError {
    pub fn kind(&self) -> &'static str {
        match self {
            BootError::StorageOpen(_) => "storage-open",
            BootError::SnapshotRead { .. } => "snapshot-read",
            BootError::TreeRestore(_) => "tree-restore",
            BootError::StyleInjection(_) => "style-injection",
        }
    }

    /// The underlying storage failure, if this error came from the store
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            BootError::StorageOpen(e) | BootError::SnapshotRead { source: e, .. } => Some(e),
            _ => None,
        }
    }
}

/// Failures while capturing a snapshot
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Serialized markup for {route} is empty")]
    EmptyMarkup { route: String },

    #[error("Failed to collect stylesheet {href}: {reason}")]
    StyleCollect { href: String, reason: String },

    #[error("Failed to write snapshot for {route}: {source}")]
    StorageWrite {
        route: String,
        #[source]
        source: StorageError,
    },
}

impl CaptureError {
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureError::EmptyMarkup { .. } => "tree-serialize",
            CaptureError::StyleCollect { .. } => "style-collect",
            CaptureError::StorageWrite { .. } => "storage-write",
        }
    }
}

/// Any classified prepaint failure.
///
/// Internal failures are logged through this type, and embedders receive it
/// from `BootOutcome::error` when they need one value to match on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepaintError {
    #[error(transparent)]
    Boot(#[from] BootError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Hydration(#[from] HydrationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PrepaintError {
    /// Domain the error belongs to
    pub fn phase(&self) -> &'static str {
        match self {
            PrepaintError::Boot(_) => "boot",
            PrepaintError::Capture(_) => "capture",
            PrepaintError::Hydration(_) => "hydration",
            PrepaintError::Storage(_) => "storage",
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PrepaintError::Boot(e) => e.kind(),
            PrepaintError::Capture(e) => e.kind(),
            PrepaintError::Hydration(e) => e.kind.as_str(),
            PrepaintError::Storage(e) => e.kind(),
        }
    }

    /// Every class degrades gracefully except a storage permission failure
    pub fn is_recoverable(&self) -> bool {
        self.storage_error().map_or(true, StorageError::is_recoverable)
    }

    /// The storage failure underneath, whichever phase hit it
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            PrepaintError::Boot(e) => e.storage_error(),
            PrepaintError::Capture(CaptureError::StorageWrite { source, .. }) => Some(source),
            PrepaintError::Storage(e) => Some(e),
            _ => None,
        }
    }
}
