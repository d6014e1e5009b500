pub mod attach;
pub mod boot;
pub mod capture;
pub mod config;
pub mod core;
pub mod data;
pub mod dom;
pub mod framework;
pub mod page;
pub mod util;

pub use attach::{
    AttachOptions, AttachOutcome, AttachReport, HydrationError, MismatchKind, ResetToFresh,
    RootGuard,
};
pub use boot::{handoff, BootOutcome, ColdStartReason, Sanitizer, ScriptStripper, Strategy};
pub use capture::{CaptureHandle, HttpStylesheetFetcher, StylesheetFetcher};
pub use config::Config;
pub use self::core::{
    BootError, CaptureError, EventCategory, EventEmitter, ObservabilityEvent, Prepaint,
    PrepaintError,
};
pub use data::{
    Database, MemorySnapshotStore, Snapshot, SnapshotStore, SqliteSnapshotStore,
    SqliteStoreOpener, StorageError, StoreOpener, StyleRecord,
};
pub use dom::{Document, Element, Node};
pub use framework::{ErrorSink, Framework, FrameworkError, StaticFramework};
pub use page::{LifecycleEvent, Page};
