//! Optional mirror configuration file (.mirrorsync.toml)

use std::path::Path;

use crate::error::{Result, SyncError};

/// Settings that tune a mirror beyond the command-line parameters
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MirrorConfig {
    /// Gitignore-style globs skipped in both trees
    pub exclude: Vec<String>,
}

/// Config file looked up in the working directory when none is given
pub const CONFIG_FILE: &str = ".mirrorsync.toml";

impl MirrorConfig {
    /// Parse config from TOML text
    ///
    /// # Errors
    /// Returns an error if the text is not valid config TOML
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load config from a file that must exist
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;
        Self::from_toml(&content).map_err(|e| SyncError::Config {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Load config from `path`, or defaults if it does not exist
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
