//! Audit events emitted by the engine and driver, and the sink that takes them

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// One auditable action or failure
///
/// Paths carried by per-file events are replica paths (root joined with the
/// relative path), except for [`SyncEvent::ScanFailed`] which names whatever
/// the walker could not read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Started,
    Completed,
    Interrupted,
    NewFileCreated(PathBuf),
    FileModified(PathBuf),
    FileRemoved(PathBuf),
    ScanFailed { path: PathBuf, error: String },
    CompareFailed { path: PathBuf, error: String },
    CopyFailed { path: PathBuf, error: String },
    RemoveFailed { path: PathBuf, error: String },
    CycleFailed { error: String },
}

impl SyncEvent {
    /// Whether this event reports a failure
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::ScanFailed { .. }
                | Self::CompareFailed { .. }
                | Self::CopyFailed { .. }
                | Self::RemoveFailed { .. }
                | Self::CycleFailed { .. }
        )
    }
}

impl fmt::Display for SyncEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started => f.write_str("Synchronization started."),
            Self::Completed => f.write_str("Synchronization completed."),
            Self::Interrupted => f.write_str("Synchronization interrupted."),
            Self::NewFileCreated(path) => write!(f, "New File Created: {}", path.display()),
            Self::FileModified(path) => write!(f, "File Modified: {}", path.display()),
            Self::FileRemoved(path) => write!(f, "File Removed: {}", path.display()),
            Self::ScanFailed { path, error } => {
                write!(f, "Scan Failed: {}: {error}", path.display())
            }
            Self::CompareFailed { path, error } => {
                write!(f, "Compare Failed: {}: {error}", path.display())
            }
            Self::CopyFailed { path, error } => {
                write!(f, "Copy Failed: {}: {error}", path.display())
            }
            Self::RemoveFailed { path, error } => {
                write!(f, "Remove Failed: {}: {error}", path.display())
            }
            Self::CycleFailed { error } => write!(f, "Synchronization failed: {error}"),
        }
    }
}

/// Destination for audit events
pub trait EventSink {
    fn record(&mut self, event: &SyncEvent);
}

impl EventSink for Vec<SyncEvent> {
    fn record(&mut self, event: &SyncEvent) {
        self.push(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn record(&mut self, event: &SyncEvent) {
        (**self).record(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn record(&mut self, event: &SyncEvent) {
        (**self).record(event);
    }
}

/// Shared sinks let a caller keep reading events while a driver owns a handle
impl<S: EventSink> EventSink for Arc<Mutex<S>> {
    fn record(&mut self, event: &SyncEvent) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(event);
    }
}
