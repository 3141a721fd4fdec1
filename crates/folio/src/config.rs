//! Store configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default project root, relative to the working directory.
pub const DEFAULT_ROOT: &str = "novel_data";

/// Default maximum size of content accepted by a single write (4 MiB).
pub const DEFAULT_MAX_CONTENT_BYTES: u64 = 4 * 1024 * 1024;

/// Tags placed in front of each name in a `list` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryLabels {
    /// Tag for files
    pub file: String,
    /// Tag for directories
    pub dir: String,
}

impl Default for EntryLabels {
    fn default() -> Self {
        Self {
            file: "[文件]".to_string(),
            dir: "[目录]".to_string(),
        }
    }
}

impl EntryLabels {
    /// Plain ASCII tags.
    pub fn ascii() -> Self {
        Self {
            file: "[file]".to_string(),
            dir: "[dir]".to_string(),
        }
    }
}

/// Configuration for a [`ProjectStore`](crate::ProjectStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory that bounds every operation
    pub root: PathBuf,
    /// Maximum size in bytes of content accepted by a single write
    pub max_content_bytes: u64,
    /// Tags used in directory listings
    pub labels: EntryLabels,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            max_content_bytes: DEFAULT_MAX_CONTENT_BYTES,
            labels: EntryLabels::default(),
        }
    }
}

impl StoreConfig {
    /// Configuration rooted at `root` with default limits and labels.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Set the content size limit.
    pub fn max_content_bytes(mut self, limit: u64) -> Self {
        self.max_content_bytes = limit;
        self
    }

    /// Set the listing tags.
    pub fn labels(mut self, labels: EntryLabels) -> Self {
        self.labels = labels;
        self
    }
}
