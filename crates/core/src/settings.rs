//! Startup parameters, validated before the first cycle runs

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SyncError};

/// Parse an interval given as whole seconds
///
/// Used as the clap value parser for the interval argument.
///
/// # Errors
/// Returns a validation error unless `value` is a positive integer
pub fn parse_interval(value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(SyncError::Validation(format!(
            "interval must be a positive integer, got {value:?}"
        ))),
    }
}

/// Validated parameters of a mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub log_file: PathBuf,
    pub interval: Duration,
}

impl SyncSettings {
    /// Validate the parameters
    ///
    /// # Errors
    /// - [`SyncError::Validation`] for an empty path, a zero interval, a source
    ///   that is not a directory, roots nested inside each other, or a log
    ///   file inside the replica
    /// - [`SyncError::NotFound`] if the source does not exist
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        log_file: impl Into<PathBuf>,
        interval_secs: u64,
    ) -> Result<Self> {
        let source = required(source.into(), "source")?;
        let replica = required(replica.into(), "replica")?;
        let log_file = required(log_file.into(), "log file")?;

        if interval_secs == 0 {
            return Err(SyncError::Validation(
                "interval must be a positive integer".to_string(),
            ));
        }

        if !source.exists() {
            return Err(SyncError::NotFound(source));
        }
        if !source.is_dir() {
            return Err(SyncError::Validation(format!(
                "source is not a directory: {}",
                source.display()
            )));
        }

        check_disjoint(&source, &replica)?;
        check_log_outside_replica(&log_file, &replica)?;

        Ok(Self {
            source,
            replica,
            log_file,
            interval: Duration::from_secs(interval_secs),
        })
    }

    /// Create the replica root if it does not exist yet
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created
    pub fn ensure_replica(&self) -> Result<()> {
        std::fs::create_dir_all(&self.replica).map_err(SyncError::io(&self.replica))
    }
}

fn required(path: PathBuf, name: &str) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(SyncError::Validation(format!("{name} path is required")));
    }
    Ok(path)
}

/// Mirroring a tree into itself (or a parent into a child) never converges
fn check_disjoint(source: &Path, replica: &Path) -> Result<()> {
    let source_abs = absolute(source)?;
    let replica_abs = absolute(replica)?;

    if source_abs.starts_with(&replica_abs) || replica_abs.starts_with(&source_abs) {
        return Err(SyncError::Validation(format!(
            "source {} and replica {} must not contain each other",
            source.display(),
            replica.display()
        )));
    }
    Ok(())
}

/// The replica is pruned to match the source, which would unlink the log
fn check_log_outside_replica(log_file: &Path, replica: &Path) -> Result<()> {
    if absolute(log_file)?.starts_with(absolute(replica)?) {
        return Err(SyncError::Validation(format!(
            "log file {} must not be inside the replica {}",
            log_file.display(),
            replica.display()
        )));
    }
    Ok(())
}

/// Resolve symlinks through the deepest existing ancestor of `path`
fn absolute(path: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(path).map_err(SyncError::io(path))?;
    let mut existing = path.as_path();
    let mut missing = Vec::new();

    loop {
        if let Ok(resolved) = existing.canonicalize() {
            return Ok(missing
                .iter()
                .rev()
                .fold(resolved, |acc: PathBuf, part| acc.join(part)));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return Ok(path.clone()),
        }
    }
}
