//! Directory tree scanning via the `ignore` crate's walker
//!
//! Every regular file is reported: no `.gitignore` or hidden-file filtering is
//! applied, since a mirror must carry the whole tree. Symbolic links are not
//! followed and never appear in a snapshot.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::path::RelativePath;
use crate::snapshot::{ScanFailure, TreeSnapshot};

/// Scanner for a single directory tree
pub struct Scanner {
    root: PathBuf,
    /// Gitignore-style globs pruned from the walk
    excludes: Vec<String>,
}

impl Scanner {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excludes: Vec::new(),
        }
    }

    /// Skip files and directories matching a gitignore-style glob
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.excludes.push(pattern.into());
        self
    }

    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Build the override matcher for exclude globs
    fn exclude_matcher(&self) -> Result<Option<Override>> {
        if self.excludes.is_empty() {
            return Ok(None);
        }

        let mut overrides = OverrideBuilder::new(&self.root);
        for pattern in &self.excludes {
            // Overrides are whitelists unless negated
            overrides
                .add(&format!("!{pattern}"))
                .map_err(|e| SyncError::Validation(format!("invalid exclude {pattern:?}: {e}")))?;
        }
        let matcher = overrides
            .build()
            .map_err(|e| SyncError::Validation(format!("invalid exclude set: {e}")))?;
        Ok(Some(matcher))
    }

    fn walk_builder(&self) -> Result<WalkBuilder> {
        let mut builder = WalkBuilder::new(&self.root);
        builder.standard_filters(false).follow_links(false);

        if let Some(matcher) = self.exclude_matcher()? {
            builder.overrides(matcher);
        }

        Ok(builder)
    }

    /// Walk the tree and collect the relative path of every regular file
    ///
    /// Unreadable entries are recorded in [`TreeSnapshot::skipped`] and the
    /// walk continues past them.
    ///
    /// # Errors
    /// Returns [`SyncError::NotFound`] if the root does not exist, and a
    /// validation error if it is not a directory or an exclude glob is invalid
    pub fn scan(&self) -> Result<TreeSnapshot> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(SyncError::Validation(format!(
                    "not a directory: {}",
                    self.root.display()
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SyncError::NotFound(self.root.clone()));
            }
            Err(e) => return Err(SyncError::io(&self.root)(e)),
        }

        let mut files = BTreeSet::new();
        let mut skipped = Vec::new();

        for result in self.walk_builder()?.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(root = %self.root.display(), "skipping unreadable entry: {err}");
                    skipped.push(ScanFailure::from_walk_error(&self.root, &err));
                    continue;
                }
            };

            // Without link following, symlinks report their own type and are skipped here
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            let Some(rel) = path
                .strip_prefix(&self.root)
                .ok()
                .and_then(RelativePath::from_path)
            else {
                warn!(path = %path.display(), "skipping file outside the scan root");
                continue;
            };

            files.insert(rel);
        }

        debug!(
            root = %self.root.display(),
            files = files.len(),
            skipped = skipped.len(),
            "scanned tree"
        );

        Ok(TreeSnapshot::new(self.root.clone(), files, skipped))
    }
}

/// Scan `root` with no excludes
///
/// # Errors
/// See [`Scanner::scan`]
pub fn scan(root: &Path) -> Result<TreeSnapshot> {
    Scanner::new(root).scan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(snapshot: &TreeSnapshot) -> Vec<String> {
        snapshot.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_scan_simple_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file1.txt"), "hello").unwrap();
        fs::write(dir.path().join("file2.txt"), "world").unwrap();

        let snapshot = scan(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["file1.txt", "file2.txt"]);
        assert!(snapshot.skipped().is_empty());
    }

    #[test]
    fn test_scan_nested_directories_records_files_only() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("sub/dir")).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("root.txt"), "root").unwrap();
        fs::write(dir.path().join("sub/nested.txt"), "nested").unwrap();
        fs::write(dir.path().join("sub/dir/deep.txt"), "deep").unwrap();

        let snapshot = scan(dir.path()).unwrap();
        assert_eq!(
            paths(&snapshot),
            vec!["root.txt", "sub/dir/deep.txt", "sub/nested.txt"]
        );
    }

    #[test]
    fn test_scan_ignores_gitignore_and_keeps_hidden_files() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("build.log"), "log").unwrap();
        fs::write(dir.path().join(".env"), "SECRET=1").unwrap();

        let snapshot = scan(dir.path()).unwrap();
        let found = paths(&snapshot);
        for expected in [".env", ".git/HEAD", ".gitignore", "build.log"] {
            assert!(found.iter().any(|p| p == expected), "missing {expected}: {found:?}");
        }
    }

    #[test]
    fn test_scan_missing_root_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = scan(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, SyncError::NotFound(_)), "{err:?}");
    }

    #[test]
    fn test_scan_file_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let err = scan(&file).unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)), "{err:?}");
    }

    #[test]
    fn test_scan_excludes_prune_files_and_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("target/debug")).unwrap();
        fs::write(dir.path().join("target/debug/app"), "bin").unwrap();
        fs::write(dir.path().join("notes.swp"), "swap").unwrap();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();

        let snapshot = Scanner::new(dir.path())
            .exclude("target/")
            .exclude("*.swp")
            .scan()
            .unwrap();
        assert_eq!(paths(&snapshot), vec!["keep.txt"]);
    }

    #[test]
    fn test_scan_invalid_exclude_is_validation_error() {
        let dir = TempDir::new().unwrap();
        let err = Scanner::new(dir.path()).exclude("a[").scan().unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)), "{err:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_does_not_follow_symlinks() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), "outside").unwrap();
        fs::write(dir.path().join("real.txt"), "real").unwrap();
        symlink(dir.path().join("real.txt"), dir.path().join("link.txt")).unwrap();
        symlink(outside.path(), dir.path().join("linked_dir")).unwrap();
        // A cycle back to the root must not hang the walk
        symlink(dir.path(), dir.path().join("loop")).unwrap();

        let snapshot = scan(dir.path()).unwrap();
        assert_eq!(paths(&snapshot), vec!["real.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_unreadable_subtree() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.txt"), "x").unwrap();
        fs::write(dir.path().join("open.txt"), "y").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users can read the directory anyway
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let snapshot = scan(dir.path()).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(paths(&snapshot), vec!["open.txt"]);
        assert!(!snapshot.skipped().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_keeps_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.txt");
        // Some filesystems only accept UTF-8 names
        if fs::write(dir.path().join(name), "latin-1").is_err() {
            return;
        }

        let snapshot = scan(dir.path()).unwrap();
        assert!(snapshot.skipped().is_empty());
        let rel = snapshot.iter().next().unwrap();
        assert_eq!(rel.under(dir.path()), dir.path().join(name));
    }
}
