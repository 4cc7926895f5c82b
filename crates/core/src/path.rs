//! Root-relative paths, the identity key correlating files across two trees

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A normalized path relative to a tree root
///
/// Two files in different trees are the same file iff their relative paths
/// compare equal. Comparison is per component and case-sensitive, and names
/// need not be valid UTF-8. [`Display`](fmt::Display) joins components with
/// `/`, replacing undecodable bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelativePath(PathBuf);

impl RelativePath {
    /// Normalize a root-stripped path
    ///
    /// Returns `None` for empty paths and paths that are absolute or climb
    /// out of the root.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut normalized = PathBuf::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        if normalized.as_os_str().is_empty() {
            return None;
        }
        Some(Self(normalized))
    }

    /// Resolve this path under `root`
    #[must_use]
    pub fn under(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Whether `prefix` is this path or one of its ancestors
    #[must_use]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", part.to_string_lossy())?;
        }
        Ok(())
    }
}

impl AsRef<Path> for RelativePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
