//! Snapshots of a directory tree and their classification against a replica

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::path::RelativePath;

/// An entry the walker could not read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

impl ScanFailure {
    pub(crate) fn from_walk_error(root: &Path, err: &ignore::Error) -> Self {
        Self {
            path: walk_error_path(err).unwrap_or(root).to_path_buf(),
            message: err.to_string(),
        }
    }
}

fn walk_error_path(err: &ignore::Error) -> Option<&Path> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.as_path()),
        ignore::Error::Loop { child, .. } => Some(child.as_path()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        _ => None,
    }
}

/// The set of regular files found under a root at one instant
#[derive(Debug, Clone)]
pub struct TreeSnapshot {
    root: PathBuf,
    files: BTreeSet<RelativePath>,
    skipped: Vec<ScanFailure>,
}

impl TreeSnapshot {
    #[must_use]
    pub fn new(root: PathBuf, files: BTreeSet<RelativePath>, skipped: Vec<ScanFailure>) -> Self {
        Self {
            root,
            files,
            skipped,
        }
    }

    /// A snapshot of a root that holds nothing (or does not exist yet)
    #[must_use]
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Self::new(root.into(), BTreeSet::new(), Vec::new())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn contains(&self, path: &RelativePath) -> bool {
        self.files.contains(path)
    }

    /// Paths in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &RelativePath> {
        self.files.iter()
    }

    /// Entries the walk had to skip
    #[must_use]
    pub fn skipped(&self) -> &[ScanFailure] {
        &self.skipped
    }

    /// Whether `path` lies under an entry the walk had to skip
    ///
    /// A failure without a usable path covers the whole tree.
    #[must_use]
    pub fn is_shadowed(&self, path: &RelativePath) -> bool {
        self.skipped
            .iter()
            .any(|failure| match failure.path.strip_prefix(&self.root) {
                Ok(prefix) => prefix.as_os_str().is_empty() || path.starts_with(prefix),
                Err(_) => false,
            })
    }

    /// Partition `self` (the source) and `replica` into the four categories
    ///
    /// `is_modified` is only consulted for paths present on both sides. When
    /// it fails, the path lands in `modified` so the copy is retried, and the
    /// error is kept in [`Classification::compare_failures`]. Replica-only
    /// paths under a source entry that could not be read are put in
    /// [`Classification::held`] instead of `deleted`.
    pub fn classify<F>(&self, replica: &Self, mut is_modified: F) -> Classification
    where
        F: FnMut(&RelativePath) -> Result<bool>,
    {
        let mut classification = Classification::default();

        for path in &self.files {
            if !replica.contains(path) {
                classification.new.push(path.clone());
                continue;
            }

            match is_modified(path) {
                Ok(true) => classification.modified.push(path.clone()),
                Ok(false) => classification.unchanged.push(path.clone()),
                Err(err) => {
                    classification.modified.push(path.clone());
                    classification.compare_failures.push((path.clone(), err));
                }
            }
        }

        for path in replica.files.difference(&self.files) {
            if self.is_shadowed(path) {
                classification.held.push(path.clone());
            } else {
                classification.deleted.push(path.clone());
            }
        }

        classification
    }
}

/// New, modified, deleted and unchanged paths for one cycle
///
/// Every path of source ∪ replica appears in exactly one of the path lists,
/// each sorted.
#[derive(Debug, Default)]
pub struct Classification {
    /// In the source only
    pub new: Vec<RelativePath>,
    /// In both, contents differ
    pub modified: Vec<RelativePath>,
    /// In the replica only
    pub deleted: Vec<RelativePath>,
    /// In both, contents equal
    pub unchanged: Vec<RelativePath>,
    /// In the replica only, but under an unreadable part of the source
    pub held: Vec<RelativePath>,
    /// Paths whose digests could not be compared
    pub compare_failures: Vec<(RelativePath, SyncError)>,
}

impl Classification {
    /// Whether the replica already matches the source
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.new.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    /// Number of paths that need a copy or delete
    #[must_use]
    pub fn pending(&self) -> usize {
        self.new.len() + self.modified.len() + self.deleted.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rel(path: &str) -> RelativePath {
        RelativePath::from_path(Path::new(path)).unwrap()
    }

    fn snapshot(root: &str, paths: &[&str]) -> TreeSnapshot {
        TreeSnapshot::new(
            PathBuf::from(root),
            paths.iter().map(|p| rel(p)).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn test_classify_partitions_every_path_once() {
        let source = snapshot("src", &["new.txt", "changed.txt", "same.txt"]);
        let replica = snapshot("dst", &["changed.txt", "same.txt", "stale.txt"]);
        let modified: HashMap<_, _> = [(rel("changed.txt"), true), (rel("same.txt"), false)]
            .into_iter()
            .collect();

        let classification = source.classify(&replica, |p| Ok(modified[p]));

        assert_eq!(classification.new, vec![rel("new.txt")]);
        assert_eq!(classification.modified, vec![rel("changed.txt")]);
        assert_eq!(classification.deleted, vec![rel("stale.txt")]);
        assert_eq!(classification.unchanged, vec![rel("same.txt")]);
        assert_eq!(classification.pending(), 3);
        assert!(!classification.is_converged());
    }

    #[test]
    fn test_classify_only_compares_shared_paths() {
        let source = snapshot("src", &["a.txt", "b.txt"]);
        let replica = snapshot("dst", &["b.txt", "c.txt"]);
        let mut compared = Vec::new();

        source.classify(&replica, |p| {
            compared.push(p.clone());
            Ok(false)
        });

        assert_eq!(compared, vec![rel("b.txt")]);
    }

    #[test]
    fn test_classify_compare_failure_counts_as_modified() {
        let source = snapshot("src", &["broken.txt"]);
        let replica = snapshot("dst", &["broken.txt"]);

        let classification = source.classify(&replica, |_| {
            Err(SyncError::Io {
                path: PathBuf::from("src/broken.txt"),
                source: std::io::Error::other("read failed"),
            })
        });

        assert_eq!(classification.modified, vec![rel("broken.txt")]);
        assert!(classification.unchanged.is_empty());
        assert_eq!(classification.compare_failures.len(), 1);
    }

    #[test]
    fn test_identical_snapshots_are_converged() {
        let source = snapshot("src", &["a.txt", "dir/b.txt"]);
        let replica = snapshot("dst", &["a.txt", "dir/b.txt"]);

        let classification = source.classify(&replica, |_| Ok(false));
        assert!(classification.is_converged());
        assert_eq!(classification.unchanged.len(), 2);
    }

    #[test]
    fn test_empty_replica_makes_everything_new() {
        let source = snapshot("src", &["a.txt", "dir1/dir2/c.txt"]);
        let replica = TreeSnapshot::empty("dst");

        let classification = source.classify(&replica, |_| unreachable!());
        assert_eq!(
            classification.new,
            vec![rel("a.txt"), rel("dir1/dir2/c.txt")]
        );
        assert!(replica.is_empty());
    }

    #[test]
    fn test_paths_under_unreadable_source_entries_are_held() {
        let mut source = snapshot("src", &["open/a.txt"]);
        source.skipped.push(ScanFailure {
            path: PathBuf::from("src").join("locked"),
            message: "permission denied".into(),
        });
        let replica = snapshot("dst", &["open/a.txt", "locked/b.txt", "locked2.txt"]);

        let classification = source.classify(&replica, |_| Ok(false));

        assert_eq!(classification.held, vec![rel("locked/b.txt")]);
        assert_eq!(classification.deleted, vec![rel("locked2.txt")]);
    }

    #[test]
    fn test_failure_without_path_holds_every_deletion() {
        let mut source = snapshot("src", &[]);
        source.skipped.push(ScanFailure {
            path: PathBuf::from("src"),
            message: "walk failed".into(),
        });
        let replica = snapshot("dst", &["a.txt", "dir/b.txt"]);

        let classification = source.classify(&replica, |_| unreachable!());

        assert!(classification.deleted.is_empty());
        assert_eq!(classification.held.len(), 2);
    }
}
