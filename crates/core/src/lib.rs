//! mirrorsync-core: One-way directory mirroring
//!
//! Provides tree scanning, content hashing, classification of source and
//! replica paths, the sync engine that converges a replica, and the periodic
//! driver with its audit log.

pub mod audit;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod hash;
pub mod path;
pub mod scan;
pub mod settings;
pub mod snapshot;

pub use audit::AuditLog;
pub use config::MirrorConfig;
pub use driver::Driver;
pub use engine::{CycleReport, SyncEngine};
pub use error::{Result, SyncError};
pub use event::{EventSink, SyncEvent};
pub use hash::{ContentHash, is_modified};
pub use path::RelativePath;
pub use scan::{Scanner, scan};
pub use settings::{SyncSettings, parse_interval};
pub use snapshot::{Classification, ScanFailure, TreeSnapshot};
