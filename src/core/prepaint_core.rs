//! The prepaint context shared by every phase

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;

use super::error::PrepaintError;
use super::events::{EventCategory, EventEmitter, ObservabilityEvent};
use crate::attach::RootGuard;
use crate::boot::Sanitizer;
use crate::capture::{CaptureState, HttpStylesheetFetcher, StylesheetFetcher};
use crate::config::Config;
use crate::data::{SnapshotStore, SqliteStoreOpener, StorageError, StoreOpener};
use crate::util::clock::{Clock, SystemClock};

/// Explicit state for one page's prepaint pipeline.
///
/// Holds everything the phases share: configuration, storage access, the
/// capture setup guard, the session kill switch and the installed root
/// guard. Independent instances never observe each other.
pub struct Prepaint {
    config: Config,
    opener: Arc<dyn StoreOpener>,
    clock: Arc<dyn Clock>,
    fetcher: Arc<dyn StylesheetFetcher>,
    sanitizer: Option<Arc<dyn Sanitizer>>,
    events: EventEmitter,
    pub(crate) capture: CaptureState,
    disabled: AtomicBool,
    pub(crate) guard: Mutex<Option<RootGuard>>,
}

impl Prepaint {
    pub fn new(config: Config, opener: Arc<dyn StoreOpener>) -> Self {
        Self {
            config,
            opener,
            clock: Arc::new(SystemClock),
            fetcher: Arc::new(HttpStylesheetFetcher::new()),
            sanitizer: None,
            events: EventEmitter::default(),
            capture: CaptureState::default(),
            disabled: AtomicBool::new(false),
            guard: Mutex::new(None),
        }
    }

    /// Context backed by the SQLite database named in `config`
    pub fn from_config(config: Config) -> Self {
        let opener = Arc::new(SqliteStoreOpener::new(config.database_path.clone()));
        Self::new(config, opener)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fetcher(mut self, fetcher: Arc<dyn StylesheetFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = Some(sanitizer);
        self
    }

    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = events;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn subscribe(&self) -> Option<broadcast::Receiver<ObservabilityEvent>> {
        self.events.subscribe()
    }

    /// Whether a permission failure switched the feature off for this session
    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    /// Corrections made by the installed root guard, if one is installed
    pub fn guard_corrections(&self) -> Option<usize> {
        self.guard.lock().as_ref().map(RootGuard::corrections)
    }

    /// Tear down the installed root guard, if any
    pub fn uninstall_guard(&self) -> bool {
        self.guard.lock().take().is_some()
    }

    /// Current time at the microsecond precision the SQLite store keeps
    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(6)
    }

    pub(crate) fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub(crate) fn fetcher(&self) -> &dyn StylesheetFetcher {
        self.fetcher.as_ref()
    }

    pub(crate) fn sanitizer(&self) -> Option<&dyn Sanitizer> {
        self.sanitizer.as_deref()
    }

    pub(crate) async fn open_store(&self) -> Result<Box<dyn SnapshotStore>, StorageError> {
        self.opener.open().await
    }

    /// Log and emit a storage failure. Permission failures disable the
    /// feature for the rest of the session.
    pub(crate) fn record_storage_error(&self, operation: &str, error: &StorageError) {
        self.log_failure(&PrepaintError::from(error.clone()), operation);
        self.events.emit(
            EventCategory::Storage,
            error.kind(),
            json!({
                "operation": operation,
                "message": error.to_string(),
                "recoverable": error.is_recoverable(),
            }),
        );
        if !error.is_recoverable() && !self.disabled.swap(true, Ordering::SeqCst) {
            tracing::warn!("Disabling prepaint for this session");
        }
    }
}

impl Prepaint {
    pub(crate) fn log_failure(&self, error: &PrepaintError, operation: &str) {
        tracing::warn!(
            phase = error.phase(),
            kind = error.kind(),
            recoverable = error.is_recoverable(),
            operation,
            error = %error,
            "Prepaint operation failed"
        );
    }
}

impl std::fmt::Debug for Prepaint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prepaint")
            .field("config", &self.config)
            .field("disabled", &self.is_disabled())
            .field("sanitizer", &self.sanitizer.is_some())
            .finish_non_exhaustive()
    }
}
