//! Storage engine configuration.
//!
//! `file_path` is the only recognized option. The struct deserializes with
//! defaults so an application can embed it in its own config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Backing file used when no path is configured.
pub const DEFAULT_FILE_PATH: &str = "file.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Path of the JSON snapshot file.
    pub file_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from(DEFAULT_FILE_PATH),
        }
    }
}

impl StoreConfig {
    pub fn with_file_path(path: impl AsRef<Path>) -> Self {
        Self {
            file_path: path.as_ref().to_path_buf(),
        }
    }
}
