//! One-way sync engine: scan both trees, classify, converge the replica
//!
//! The engine keeps no state between cycles. Every call to
//! [`SyncEngine::run_cycle`] rescans both trees and rehashes shared files.

use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::event::{EventSink, SyncEvent};
use crate::hash;
use crate::path::RelativePath;
use crate::scan::Scanner;
use crate::snapshot::{Classification, TreeSnapshot};

/// What one cycle did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Per-path failures: unreadable entries, failed compares, copies and removals
    pub failed: usize,
}

impl CycleReport {
    /// Number of copy and delete operations that succeeded
    #[must_use]
    pub fn changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changes() == 0 && self.failed == 0
    }
}

/// Mirrors `source` into `replica`
#[derive(Debug, Clone)]
pub struct SyncEngine {
    source: PathBuf,
    replica: PathBuf,
    excludes: Vec<String>,
}

impl SyncEngine {
    #[must_use]
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
            excludes: Vec::new(),
        }
    }

    /// Paths matching these globs are left alone on both sides
    #[must_use]
    pub fn with_excludes(mut self, patterns: Vec<String>) -> Self {
        self.excludes = patterns;
        self
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn replica(&self) -> &Path {
        &self.replica
    }

    fn scanner(&self, root: &Path) -> Scanner {
        Scanner::new(root).excludes(self.excludes.iter().cloned())
    }

    /// Scan both trees
    ///
    /// A missing replica root scans as empty; the first copy recreates it.
    ///
    /// # Errors
    /// Fails if the source root is missing or either root is unusable
    pub fn snapshots(&self) -> Result<(TreeSnapshot, TreeSnapshot)> {
        let source = self.scanner(&self.source).scan()?;
        let replica = match self.scanner(&self.replica).scan() {
            Err(SyncError::NotFound(root)) => {
                debug!(root = %root.display(), "replica root missing, treating as empty");
                TreeSnapshot::empty(root)
            }
            other => other?,
        };
        Ok((source, replica))
    }

    /// Scan both trees and classify every path, without touching the replica
    ///
    /// # Errors
    /// See [`SyncEngine::snapshots`]
    pub fn classify(&self) -> Result<Classification> {
        let (source, replica) = self.snapshots()?;
        Ok(self.classify_snapshots(&source, &replica))
    }

    fn classify_snapshots(&self, source: &TreeSnapshot, replica: &TreeSnapshot) -> Classification {
        source.classify(replica, |rel| {
            hash::is_modified(rel, &self.source, &self.replica)
        })
    }

    /// Run one scan-classify-apply pass
    ///
    /// Failures on individual paths are reported to `sink` and counted in the
    /// report; they never stop the cycle. Removals run before copies so a
    /// path that switched between file and directory in the source can be
    /// replaced in one pass.
    ///
    /// # Errors
    /// Fails only when a root cannot be scanned at all
    pub fn run_cycle(&self, sink: &mut dyn EventSink) -> Result<CycleReport> {
        let (source, replica) = self.snapshots()?;
        let mut report = CycleReport::default();

        for failure in source.skipped().iter().chain(replica.skipped()) {
            report.failed += 1;
            sink.record(&SyncEvent::ScanFailed {
                path: failure.path.clone(),
                error: failure.message.clone(),
            });
        }

        let classification = self.classify_snapshots(&source, &replica);
        report.unchanged = classification.unchanged.len();
        debug!(
            new = classification.new.len(),
            modified = classification.modified.len(),
            deleted = classification.deleted.len(),
            unchanged = classification.unchanged.len(),
            held = classification.held.len(),
            "classified"
        );
        for rel in &classification.held {
            debug!(path = %rel, "kept: source side could not be read");
        }

        for (rel, err) in &classification.compare_failures {
            warn!(path = %rel, "compare failed, will recopy: {err}");
            report.failed += 1;
            sink.record(&SyncEvent::CompareFailed {
                path: rel.under(&self.replica),
                error: err.to_string(),
            });
        }

        for rel in &classification.deleted {
            match self.remove_from_replica(rel) {
                Ok(Some(path)) => {
                    report.removed += 1;
                    sink.record(&SyncEvent::FileRemoved(path));
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(path = %rel, "remove failed: {err}");
                    report.failed += 1;
                    sink.record(&SyncEvent::RemoveFailed {
                        path: rel.under(&self.replica),
                        error: err.to_string(),
                    });
                }
            }
        }

        for rel in &classification.new {
            match self.copy_into_replica(rel) {
                Ok(path) => {
                    report.created += 1;
                    sink.record(&SyncEvent::NewFileCreated(path));
                }
                Err(err) => self.record_copy_failure(rel, &err, sink, &mut report),
            }
        }

        for rel in &classification.modified {
            match self.copy_into_replica(rel) {
                Ok(path) => {
                    report.modified += 1;
                    sink.record(&SyncEvent::FileModified(path));
                }
                Err(err) => self.record_copy_failure(rel, &err, sink, &mut report),
            }
        }

        info!(
            created = report.created,
            modified = report.modified,
            removed = report.removed,
            unchanged = report.unchanged,
            failed = report.failed,
            "cycle finished"
        );

        Ok(report)
    }

    fn record_copy_failure(
        &self,
        rel: &RelativePath,
        err: &SyncError,
        sink: &mut dyn EventSink,
        report: &mut CycleReport,
    ) {
        warn!(path = %rel, "copy failed: {err}");
        report.failed += 1;
        sink.record(&SyncEvent::CopyFailed {
            path: rel.under(&self.replica),
            error: err.to_string(),
        });
    }

    /// Copy one file's content and timestamps from source to replica
    fn copy_into_replica(&self, rel: &RelativePath) -> Result<PathBuf> {
        let from = rel.under(&self.source);
        let to = rel.under(&self.replica);

        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent).map_err(SyncError::io(parent))?;
        }
        clear_destination(&to)?;

        fs::copy(&from, &to).map_err(|source| SyncError::Copy {
            from: from.clone(),
            to: to.clone(),
            source,
        })?;
        copy_times(&from, &to);

        debug!(path = %rel, "copied");
        Ok(to)
    }

    /// Remove one file from the replica
    ///
    /// Returns `None` if it had already disappeared.
    fn remove_from_replica(&self, rel: &RelativePath) -> Result<Option<PathBuf>> {
        let path = rel.under(&self.replica);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %rel, "removed");
                Ok(Some(path))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %rel, "already gone");
                Ok(None)
            }
            Err(e) => Err(SyncError::io(path)(e)),
        }
    }
}

/// Make room for a regular file at `to`
///
/// A symlink is unlinked so the copy cannot write through it. A directory is
/// removed with everything left inside it: the source holds a file at this
/// path, so no tracked file can live below it.
fn clear_destination(to: &Path) -> Result<()> {
    let Ok(meta) = fs::symlink_metadata(to) else {
        return Ok(());
    };

    if meta.file_type().is_symlink() {
        fs::remove_file(to).map_err(SyncError::io(to))?;
    } else if meta.is_dir() {
        debug!(path = %to.display(), "replacing directory with file");
        fs::remove_dir_all(to).map_err(SyncError::io(to))?;
    }
    Ok(())
}

/// Best effort: a copy whose timestamps could not be set still counts
fn copy_times(from: &Path, to: &Path) {
    let result = fs::metadata(from).and_then(|meta| {
        filetime::set_file_times(
            to,
            FileTime::from_last_access_time(&meta),
            FileTime::from_last_modification_time(&meta),
        )
    });

    if let Err(err) = result {
        warn!(path = %to.display(), "could not copy timestamps: {err}");
    }
}
