//! Append-only audit log: one `<timestamp> - <message>` line per event

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};

use crate::error::{Result, SyncError};
use crate::event::{EventSink, SyncEvent};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format one log line (without the trailing newline)
pub fn format_entry<Tz>(timestamp: &DateTime<Tz>, event: &SyncEvent) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{} - {event}", timestamp.format(TIMESTAMP_FORMAT))
}

/// Audit log file opened in append mode
///
/// Existing content is never truncated or rotated.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    file: File,
}

impl AuditLog {
    /// Open (creating if needed) the log file for appending
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened for writing
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(SyncError::io(&path))?;
        Ok(Self { path, file })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line stamped with the current local time
    ///
    /// # Errors
    /// Returns an error if the write fails
    pub fn append(&mut self, event: &SyncEvent) -> Result<()> {
        let line = format_entry(&Local::now(), event);
        writeln!(self.file, "{line}").map_err(SyncError::io(&self.path))
    }
}

impl EventSink for AuditLog {
    fn record(&mut self, event: &SyncEvent) {
        if let Err(err) = self.append(event) {
            tracing::error!(event = %event, "could not write audit log: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_entry() {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap()
            .and_utc();
        let line = format_entry(&timestamp, &SyncEvent::Started);
        assert_eq!(line, "2024-03-09 07:05:01 - Synchronization started.");
    }

    #[test]
    fn test_append_preserves_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.log");
        fs::write(&path, "earlier line\n").unwrap();

        let mut log = AuditLog::open(&path).unwrap();
        log.record(&SyncEvent::Started);
        log.record(&SyncEvent::FileRemoved(PathBuf::from("replica/b.txt")));
        drop(log);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "earlier line");
        assert!(lines[1].ends_with(" - Synchronization started."), "{lines:?}");
        assert!(lines[2].ends_with(" - File Removed: replica/b.txt"), "{lines:?}");
    }

    #[test]
    fn test_timestamp_prefix_is_parseable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sync.log");

        let mut log = AuditLog::open(&path).unwrap();
        log.record(&SyncEvent::Completed);
        drop(log);

        let content = fs::read_to_string(&path).unwrap();
        let (stamp, message) = content.trim_end().split_once(" - ").unwrap();
        assert_eq!(message, "Synchronization completed.");
        chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).unwrap();
    }

    #[test]
    fn test_open_in_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let err = AuditLog::open(dir.path().join("no/such/dir/sync.log")).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }), "{err:?}");
    }
}
