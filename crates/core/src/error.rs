//! Error type shared by every stage of a sync cycle

use std::path::PathBuf;

/// Errors raised while validating settings or running a cycle
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A startup parameter is missing or malformed
    #[error("{0}")]
    Validation(String),

    /// A root directory does not exist
    #[error("directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading, copying or removing a single path failed
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying a file into the replica failed
    #[error("copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be read or parsed
    #[error("failed to load config {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The blocking task running a cycle panicked or was cancelled
    #[error("sync task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Adapter for `map_err` that attaches the offending path to an I/O error
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    /// Whether this error means the path no longer exists
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } | Self::Copy { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
