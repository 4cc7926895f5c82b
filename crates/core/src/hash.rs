//! Content hashing using BLAKE3, used as an equality oracle between two files

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, SyncError};
use crate::path::RelativePath;

/// Files are streamed through the hasher in chunks of this size
pub const CHUNK_SIZE: usize = 4096;

/// A content hash using BLAKE3 (256-bit)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Hash arbitrary bytes
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hash a file by path, reading it in [`CHUNK_SIZE`] chunks
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or a read fails mid-stream
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(SyncError::io(path))?;
        let mut hasher = blake3::Hasher::new();
        let mut buffer = [0u8; CHUNK_SIZE];

        loop {
            let bytes_read = file.read(&mut buffer).map_err(SyncError::io(path))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(Self(*hasher.finalize().as_bytes()))
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "ContentHash({})", hex.get(..16).unwrap_or(&hex))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "{}", hex.get(..16).unwrap_or(&hex))
    }
}

/// Whether `rel` has different content under the two roots
///
/// A path missing on either side is reported as not modified; presence is
/// decided by classification, not here.
///
/// # Errors
/// Returns an error if either file cannot be hashed
pub fn is_modified(rel: &RelativePath, source_root: &Path, replica_root: &Path) -> Result<bool> {
    let source = rel.under(source_root);
    let replica = rel.under(replica_root);

    if !source.exists() || !replica.exists() {
        return Ok(false);
    }

    let source_hash = ContentHash::from_file(&source)?;
    let replica_hash = ContentHash::from_file(&replica)?;
    tracing::trace!(path = %rel, %source_hash, %replica_hash, "compared digests");

    Ok(source_hash != replica_hash)
}
